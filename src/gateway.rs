use crate::{*, error::*, model::*, observer, transport::Transport, workspace::Workspace};
use libc::pid_t;
use std::sync::{Arc, Mutex};

// C5: the single choke point every command passes through. `inner` is the global lock that
// serializes every command — holding it for the whole request/response round trip is what
// gives callers from different threads a total order matching lock-acquisition order.
pub struct Gateway {
    pid: pid_t,
    inner: Mutex<Inner>,
    shared: Arc<observer::Shared>,
}

struct Inner {
    transport: Transport,
    workspace: Workspace,
}

#[derive(Default, Clone)]
pub struct CommandOptions {
    pub control: Option<u8>,
    pub cli_output: bool,
    pub send_with_file: Option<Vec<u8>>,
    pub recv_with_file: bool,
}

#[derive(Debug, Clone)]
pub enum Response {
    Text(String),
    Blob(Vec<u8>),
    Empty,
}

impl Response {
    pub fn into_text(self) -> Option<String> {
        match self {
            Response::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_blob(self) -> Option<Vec<u8>> {
        match self {
            Response::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl Gateway {
    pub fn new(pid: pid_t, transport: Transport, workspace: Workspace, shared: Arc<observer::Shared>) -> Gateway {
        Gateway {
            pid,
            inner: Mutex::new(Inner {transport, workspace}),
            shared,
        }
    }

    pub fn pid(&self) -> pid_t { self.pid }

    pub fn workspace_async_log_path(&self) -> std::path::PathBuf {
        self.inner.lock().unwrap().workspace.async_log_path()
    }

    // Detach's Ctrl-D goes straight to the transport, bypassing the running/stopped guard that
    // applies to the interrupt control path — it tears down the session regardless of state.
    pub fn send_eof(&self) -> Result<()> {
        self.inner.lock().unwrap().transport.send_eof()
    }

    // Public contract from spec: `None` means "the command was refused by a guard", not an
    // error — callers branch on it, they don't unwrap it.
    pub fn send_command(&self, command: &str, opts: CommandOptions) -> Result<Option<Response>> {
        let mut inner = self.inner.lock().unwrap();

        let state = *self.shared.state.lock().unwrap();

        if let Some(byte) = opts.control {
            if state != InferiorState::Running {
                return Ok(None);
            }
            inner.transport.send_control(byte)?;
            return Ok(Some(Response::Empty));
        }

        if !state.accepts_non_control_command() {
            return Ok(None);
        }

        if let Some(payload) = &opts.send_with_file {
            inner.workspace.write_send_blob(payload)?;
        }
        if opts.recv_with_file || opts.cli_output {
            inner.workspace.truncate_recv()?;
        }

        *self.shared.pending_response.lock().unwrap() = None;
        inner.transport.send_source_command(&inner.workspace, command, opts.cli_output)?;
        let text = self.await_fence();

        if opts.recv_with_file {
            Ok(Some(Response::Blob(inner.workspace.read_recv_blob()?)))
        } else if opts.cli_output {
            // `cli-output source` redirects the debugger's human-readable output into recv.blob,
            // leaving only the command echo in-band — the in-band fence text is discarded here.
            let bytes = inner.workspace.read_recv_blob()?;
            Ok(Some(Response::Text(String::from_utf8_lossy(&bytes).into_owned())))
        } else {
            Ok(Some(Response::Text(text)))
        }
    }

    // Blocks on the observer's response condvar until the fence for the command just sent is
    // seen. No gateway lock changes hands here beyond the one `send_command` already holds, so
    // overlapping `send_command` calls still serialize.
    fn await_fence(&self) -> String {
        let mut guard = self.shared.pending_response.lock().unwrap();
        loop {
            if let Some(text) = guard.take() {
                return text;
            }
            guard = self.shared.response_cv.wait(guard).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_options_default_to_no_control_byte() {
        let opts = CommandOptions::default();
        assert!(opts.control.is_none());
        assert!(!opts.cli_output);
        assert!(!opts.recv_with_file);
    }

    #[test]
    fn response_accessors_match_variant() {
        assert_eq!(Response::Text("x".into()).into_text(), Some("x".into()));
        assert_eq!(Response::Blob(vec![1]).into_blob(), Some(vec![1]));
        assert_eq!(Response::Empty.into_text(), None);
    }
}
