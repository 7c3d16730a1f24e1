use std::collections::HashMap;

// Plain data types shared across components. No I/O lives here, so every other module can
// depend on this one without creating a cycle.

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InferiorState {
    Unknown,
    Running,
    Stopped,
    Exited,
}

impl InferiorState {
    // A non-control command may only begin when the inferior is stopped or its state has
    // never been observed; Ctrl-C is the only thing allowed to interrupt a running inferior.
    pub fn accepts_non_control_command(&self) -> bool {
        matches!(self, InferiorState::Stopped | InferiorState::Unknown)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ValueKind {
    Byte,
    Word,
    DWord,
    QWord,
    Float,
    Double,
    String { encoding: StringEncoding, zero_terminated: bool },
    ByteArray,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum StringEncoding {
    Ascii,
    Utf8,
}

impl ValueKind {
    // Fixed width in bytes for scalar kinds; String/ByteArray carry their length on the
    // address-table row instead (it isn't a property of the kind itself).
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ValueKind::Byte => Some(1),
            ValueKind::Word => Some(2),
            ValueKind::DWord => Some(4),
            ValueKind::QWord => Some(8),
            ValueKind::Float => Some(4),
            ValueKind::Double => Some(8),
            ValueKind::String {..} | ValueKind::ByteArray => None,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum AddressExpr {
    Hex(u64),
    Symbolic(String),
}

#[derive(Clone, Debug)]
pub struct AddressEntry {
    pub description: String,
    pub address: AddressExpr,
    pub kind: ValueKind,
    pub frozen: bool,
    // Only meaningful for String/ByteArray; ignored for fixed-width scalar kinds.
    pub length: usize,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Address(pub u64);

#[derive(Clone, Debug)]
pub struct DisassemblyRow {
    pub address: Address,
    pub bytes: Vec<u8>,
    pub mnemonic: String,
}

// Owned by the memory-view collaborator, not the session: bookmarks and travel history only
// persist while that view is open.
#[derive(Default, Debug)]
pub struct MemoryView {
    travel_history: Vec<Address>,
    bookmarks: HashMap<Address, String>,
}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl MemoryView {
    pub fn new() -> Self {
        MemoryView::default()
    }

    pub fn navigate_to(&mut self, addr: Address) {
        self.travel_history.push(addr);
    }

    pub fn travel_back(&mut self) -> Option<Address> {
        // Top of the stack is "current"; going back pops it and returns what's now current.
        self.travel_history.pop();
        self.travel_history.last().copied()
    }

    pub fn current(&self) -> Option<Address> {
        self.travel_history.last().copied()
    }

    pub fn set_bookmark(&mut self, addr: Address, comment: String) {
        self.bookmarks.insert(addr, comment);
    }

    pub fn remove_bookmark(&mut self, addr: Address) -> Option<String> {
        self.bookmarks.remove(&addr)
    }

    pub fn bookmark(&self, addr: Address) -> Option<&String> {
        self.bookmarks.get(&addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inferior_state_gates_non_control_commands() {
        assert!(InferiorState::Stopped.accepts_non_control_command());
        assert!(InferiorState::Unknown.accepts_non_control_command());
        assert!(!InferiorState::Running.accepts_non_control_command());
        assert!(!InferiorState::Exited.accepts_non_control_command());
    }

    #[test]
    fn fixed_width_is_none_for_variable_length_kinds() {
        assert_eq!(ValueKind::DWord.fixed_width(), Some(4));
        assert_eq!(ValueKind::ByteArray.fixed_width(), None);
        assert_eq!(ValueKind::String {encoding: StringEncoding::Utf8, zero_terminated: true}.fixed_width(), None);
    }

    #[test]
    fn memory_view_travel_history_is_a_stack() {
        let mut v = MemoryView::new();
        v.navigate_to(Address(0x1000));
        v.navigate_to(Address(0x2000));
        assert_eq!(v.current(), Some(Address(0x2000)));
        assert_eq!(v.travel_back(), Some(Address(0x1000)));
        assert_eq!(v.travel_back(), None);
    }

    #[test]
    fn memory_view_bookmarks() {
        let mut v = MemoryView::new();
        v.set_bookmark(Address(0x400000), "entry point".to_string());
        assert_eq!(v.bookmark(Address(0x400000)).map(String::as_str), Some("entry point"));
        assert_eq!(v.remove_bookmark(Address(0x400000)), Some("entry point".to_string()));
        assert_eq!(v.bookmark(Address(0x400000)), None);
    }
}
