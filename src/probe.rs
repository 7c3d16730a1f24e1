use crate::{*, error::*, util::*, procfs::*};
use libc::pid_t;
use std::thread;
use std::time::Duration;

// C1: non-intrusive attach-test and tracer detection. Side-effect free aside from the momentary
// attach/detach pulse in can_attach; never leaves the target stopped.

// Tries PTRACE_ATTACH/wait/PTRACE_DETACH. True if the pid is attachable right now: it exists,
// we have permission, and nothing else is already tracing it.
pub fn can_attach(pid: pid_t) -> bool {
    unsafe {
        if ptrace(libc::PTRACE_ATTACH as libc::c_uint, pid, 0, 0).is_err() {
            return false;
        }
        let mut status: libc::c_int = 0;
        libc::waitpid(pid, &mut status, 0);
        let _ = ptrace(libc::PTRACE_DETACH as libc::c_uint, pid, 0, 0);
        // Give the kernel a moment to actually resume the target before callers start poking it.
        thread::sleep(Duration::from_millis(10));
        true
    }
}

// None if pid doesn't exist or isn't traced; Some(tracer command name), "" if the tracer's comm
// couldn't be resolved (it may have exited between the two /proc reads).
pub fn is_traced(pid: pid_t) -> Result<Option<String>> {
    match tracer_of(pid)? {
        None => Ok(None),
        Some((_tracer_pid, name)) => Ok(Some(name.unwrap_or_default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_attach_to_self_fails() {
        // A process can't PTRACE_ATTACH itself; this also exercises the failure path without
        // requiring a spawned child or root.
        assert!(!can_attach(std::process::id() as pid_t));
    }

    #[test]
    fn can_attach_to_nonexistent_pid_fails() {
        assert!(!can_attach(i32::MAX - 1));
    }

    #[test]
    fn is_traced_on_nonexistent_pid_is_error() {
        assert!(is_traced(i32::MAX - 1).is_err());
    }
}
