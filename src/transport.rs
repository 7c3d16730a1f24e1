use crate::{*, error::*, util::*, pty::*, workspace::*};
use std::ffi::CString;
use std::fs::File;
use std::io::Write;
use std::os::fd::AsRawFd;

pub const PROMPT_SENTINEL: &str = "(gdb)";

// C3: the long-lived debugger child process, driven over a pty. Not called directly by
// clients — it is the exclusive servant of the Command Gateway (C5).
pub struct Transport {
    pty: Pty,
    master: File,
    child_pid: libc::pid_t,
}

impl Transport {
    // Spawns `LC_NUMERIC=C <debugger_path> --interpreter=mi` under a fresh pty with echo
    // disabled and (by construction, since we never set a read timeout anywhere) an unbounded
    // response timeout.
    pub fn spawn(debugger_path: &str, use_sudo: bool) -> Result<Transport> {
        let pty = open_pty()?;
        let slave_path_c = CString::new(pty.slave_path.clone()).map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?;

        let mut argv: Vec<CString> = Vec::new();
        if use_sudo {
            argv.push(CString::new("sudo").unwrap());
        }
        argv.push(CString::new(debugger_path).map_err(|e| Error::new(ErrorKind::Internal, e.to_string()))?);
        argv.push(CString::new("--interpreter=mi").unwrap());
        let env_numeric = CString::new("LC_NUMERIC=C").unwrap();

        let mut c_argv: Vec<*const libc::c_char> = argv.iter().map(|s| s.as_ptr()).collect();
        c_argv.push(std::ptr::null());

        let pid = unsafe { libc::fork() };
        if pid < 0 {
            return errno_err!("fork() failed");
        }
        if pid == 0 {
            // Child: become session leader of the new pty, point stdio at the slave side, exec.
            unsafe {
                libc::setsid();
                let slave_fd = libc::open(slave_path_c.as_ptr(), libc::O_RDWR);
                if slave_fd < 0 {
                    libc::_exit(1);
                }
                libc::ioctl(slave_fd, libc::TIOCSCTTY as libc::c_ulong, 0);
                let _ = disable_echo(slave_fd);
                libc::dup2(slave_fd, 0);
                libc::dup2(slave_fd, 1);
                libc::dup2(slave_fd, 2);
                if slave_fd > 2 {
                    libc::close(slave_fd);
                }
                libc::close(pty.master_fd);
                libc::putenv(env_numeric.into_raw());
                libc::execvp(c_argv[0], c_argv.as_ptr());
                libc::_exit(127);
            }
        }

        let master = unsafe { pty.master_file() };
        Ok(Transport {pty, master, child_pid: pid})
    }

    pub fn child_pid(&self) -> libc::pid_t { self.child_pid }

    pub fn try_clone_master(&self) -> Result<File> {
        Ok(self.master.try_clone()?)
    }

    // Regular command path: write the command text to cmd.script, then ask the debugger to
    // source it. Avoids writing the command directly to the pty, which truncates long input.
    pub fn send_source_command(&mut self, workspace: &Workspace, command: &str, cli_output: bool) -> Result<()> {
        workspace.write_cmd_script(command)?;
        let script_path = workspace.cmd_script_path();
        let script_path = script_path.to_string_lossy();
        let line = if cli_output {
            format!("cli-output source {}\n", script_path)
        } else {
            format!("source {}\n", script_path)
        };
        self.master.write_all(line.as_bytes())?;
        Ok(())
    }

    // Control path: a single literal control character, e.g. 0x03 for Ctrl-C.
    pub fn send_control(&mut self, byte: u8) -> Result<()> {
        self.master.write_all(&[byte])?;
        Ok(())
    }

    // Ctrl-D: end of file, used by detach().
    pub fn send_eof(&mut self) -> Result<()> {
        self.send_control(0x04)
    }

    pub fn master_raw_fd(&self) -> i32 {
        self.master.as_raw_fd()
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        unsafe {
            libc::kill(self.child_pid, libc::SIGTERM);
            let mut status = 0;
            libc::waitpid(self.child_pid, &mut status, libc::WNOHANG);
        }
    }
}
