use crate::error::*;
use libc::pid_t;

// Thin wrapper around libc::ptrace(): clears errno first (PTRACE_PEEK* legitimately return -1
// for values whose high bits happen to be 0xfff..f, so checking errno is the only reliable way
// to detect failure), and turns a -1-with-errno-set result into Err.
pub unsafe fn ptrace(request: libc::c_uint, pid: pid_t, addr: u64, data: u64) -> Result<i64> {
    *libc_errno_location() = 0;
    let r = libc::ptrace(request as libc::c_int, pid, addr as *mut libc::c_void, data as *mut libc::c_void);
    if r == -1 && *libc_errno_location() != 0 {
        return errno_err!("ptrace({}, {}) failed", request, pid);
    }
    Ok(r as i64)
}

unsafe fn libc_errno_location() -> *mut i32 {
    libc::__errno_location()
}

// Random-ish suffix for workspace directory names, to avoid collisions when a pid is reused
// shortly after a previous session's workspace was left behind (see workspace.rs: we still key
// primarily by pid, this is only for truly exceptional double-attach races).
pub fn random_u64() -> u64 {
    use rand::RngCore;
    rand::thread_rng().next_u64()
}

// Parses a hex string that may or may not carry a "0x" prefix, as gdb-family debuggers print it.
pub fn parse_hex_addr(s: &str) -> Option<usize> {
    let s = s.trim();
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    if s.is_empty() {
        return None;
    }
    usize::from_str_radix(s, 16).ok()
}

pub fn format_hex_addr(addr: usize) -> String {
    format!("0x{:x}", addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing_accepts_prefix_or_not() {
        assert_eq!(parse_hex_addr("0x40c431"), Some(0x40c431));
        assert_eq!(parse_hex_addr("40c431"), Some(0x40c431));
        assert_eq!(parse_hex_addr(""), None);
        assert_eq!(parse_hex_addr("zz"), None);
    }
}
