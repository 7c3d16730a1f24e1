use crate::{*, error::*, util::*};
use std::ffi::CStr;
use std::fs::File;
use std::os::fd::{FromRawFd, RawFd};

// A pseudo-terminal pair, opened with the raw posix_openpt/grantpt/unlockpt/ptsname sequence
// directly over libc rather than a nix/portable-pty dependency.
pub struct Pty {
    pub master_fd: RawFd,
    pub slave_path: String,
}

pub fn open_pty() -> Result<Pty> {
    unsafe {
        let master_fd = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
        if master_fd < 0 {
            return errno_err!("posix_openpt failed");
        }
        if libc::grantpt(master_fd) != 0 {
            libc::close(master_fd);
            return errno_err!("grantpt failed");
        }
        if libc::unlockpt(master_fd) != 0 {
            libc::close(master_fd);
            return errno_err!("unlockpt failed");
        }
        let mut buf = [0i8; 256];
        if libc::ptsname_r(master_fd, buf.as_mut_ptr(), buf.len()) != 0 {
            libc::close(master_fd);
            return errno_err!("ptsname_r failed");
        }
        let slave_path = CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned();
        Ok(Pty {master_fd, slave_path})
    }
}

// Disables local echo on the slave side of the pty (matching pexpect's setecho(False)), so the
// debugger's own line-editing doesn't duplicate what we write to cmd.script/the control channel
// back into the output stream we're trying to parse.
pub fn disable_echo(slave_fd: RawFd) -> Result<()> {
    unsafe {
        let mut term: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(slave_fd, &mut term) != 0 {
            return errno_err!("tcgetattr failed");
        }
        term.c_lflag &= !(libc::ECHO | libc::ECHONL);
        if libc::tcsetattr(slave_fd, libc::TCSANOW, &term) != 0 {
            return errno_err!("tcsetattr failed");
        }
        Ok(())
    }
}

impl Pty {
    // SAFETY: `libc::dup` must succeed; the returned File owns an independent fd over the same
    // open pty, so Pty keeps closing master_fd on its own Drop as usual.
    pub unsafe fn master_file(&self) -> File {
        File::from_raw_fd(libc::dup(self.master_fd))
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        unsafe { libc::close(self.master_fd); }
    }
}
