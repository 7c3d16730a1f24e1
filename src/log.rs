use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

// Ring buffer of user-facing log lines (session events: exits, signals, write failures).
// Separate from the eprintln!() trace/info output, which is for developers reading the terminal,
// not for the GUI's log panel.
pub struct Log {
    lines: VecDeque<(u64, String)>,
    capacity: usize,
}

impl Log {
    pub fn new() -> Self {
        Log {lines: VecDeque::new(), capacity: 1000}
    }

    pub fn push(&mut self, line: String) {
        let t = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0);
        self.lines.push_back((t, line));
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &(u64, String)> {
        self.lines.iter()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[macro_export]
macro_rules! log {
    ($log:expr, $($arg:tt)*) => {
        $log.push(format!($($arg)*))
    };
}
