use crate::{*, model::*, transport::PROMPT_SENTINEL};
use std::fs::File;
use std::io::Read;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, mpsc};
use std::thread::{self, JoinHandle};

// C4: background reader. Scans the captured stream for async status records and for the
// command-echo fence that separates a response from prior async noise. Holds no locks that
// block the gateway: `shared` is only ever held for the instant it takes to set a value and
// notify.
pub struct Shared {
    pub state: Mutex<InferiorState>,
    pub state_cv: Condvar,
    pub pending_response: Mutex<Option<String>>,
    pub response_cv: Condvar,
}

impl Shared {
    pub fn new() -> Arc<Shared> {
        Arc::new(Shared {
            state: Mutex::new(InferiorState::Unknown),
            state_cv: Condvar::new(),
            pending_response: Mutex::new(None),
            response_cv: Condvar::new(),
        })
    }
}

pub struct Observer {
    join: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

pub fn spawn(master: File, cmd_script_path: &Path, shared: Arc<Shared>, async_tx: mpsc::Sender<String>, trace_logging: bool) -> Observer {
    let stop = Arc::new(AtomicBool::new(false));
    let stop2 = stop.clone();
    let marker = format!("source {}", cmd_script_path.to_string_lossy());
    let join = thread::Builder::new()
        .name("state-observer".to_string())
        .spawn(move || reader_loop(master, &marker, shared, async_tx, stop2, trace_logging))
        .expect("failed to spawn state observer thread");
    Observer {join: Some(join), stop}
}

impl Observer {
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        self.stop();
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

// Polls with a short timeout rather than blocking in read() forever, so `stop` is noticed
// within ~200ms instead of only on the next byte the debugger happens to write.
fn wait_readable(fd: i32, timeout_ms: i32) -> bool {
    let mut pfd = libc::pollfd {fd, events: libc::POLLIN, revents: 0};
    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    rc > 0 && (pfd.revents & libc::POLLIN) != 0
}

fn reader_loop(mut master: File, marker: &str, shared: Arc<Shared>, async_tx: mpsc::Sender<String>, stop: Arc<AtomicBool>, trace_logging: bool) {
    let fd = master.as_raw_fd();
    let mut buf = [0u8; 4096];
    let mut acc = String::new();
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        if !wait_readable(fd, 200) {
            continue;
        }
        let n = match master.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => n,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => return,
        };
        acc.push_str(&String::from_utf8_lossy(&buf[..n]));

        while let Some(idx) = acc.find(PROMPT_SENTINEL) {
            let before = acc[..idx].to_string();
            acc.drain(..idx + PROMPT_SENTINEL.len());
            if trace_logging {
                eprintln!("trace: observer fence chunk: {:?}", before);
            }

            if let Some(new_state) = detect_status_transition(&before) {
                let mut s = shared.state.lock().unwrap();
                if *s != new_state {
                    *s = new_state;
                    shared.state_cv.notify_all();
                }
            }

            match split_fence_chunk(&before, marker) {
                FenceChunk::Response(resp) => {
                    let mut r = shared.pending_response.lock().unwrap();
                    *r = Some(resp.trim().to_string());
                    shared.response_cv.notify_all();
                }
                FenceChunk::AsyncOutput(text) => {
                    if !text.trim().is_empty() {
                        let _ = async_tx.send(text);
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenceChunk {
    Response(String),
    AsyncOutput(String),
}

// Splits one fence-delimited chunk (text preceding a "(gdb)" prompt) into the command's own
// response vs. unrelated async noise, by finding the echo of the sourced command file.
// If the marker isn't present, the entire chunk is async output that arrived between commands.
pub fn split_fence_chunk(text: &str, marker: &str) -> FenceChunk {
    match text.find(marker) {
        Some(idx) => {
            let after = &text[idx + marker.len()..];
            let response = match after.find('\n') {
                Some(nl) => &after[nl + 1..],
                None => after,
            };
            FenceChunk::Response(response.to_string())
        }
        None => FenceChunk::AsyncOutput(text.to_string()),
    }
}

// Detection rules from spec: `stopped-threads="all"` => Stopped; `*running,thread-id="all"` =>
// Running. If both patterns occur in the same chunk, the one that appears later wins (matches
// the debugger's actual chronological order within the batch).
pub fn detect_status_transition(text: &str) -> Option<InferiorState> {
    let stopped_pos = text.rfind(r#"stopped-threads="all""#);
    let running_pos = text.rfind(r#"*running,thread-id="all""#);
    match (stopped_pos, running_pos) {
        (Some(s), Some(r)) => Some(if s > r {InferiorState::Stopped} else {InferiorState::Running}),
        (Some(_), None) => Some(InferiorState::Stopped),
        (None, Some(_)) => Some(InferiorState::Running),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_split_finds_response_after_marker() {
        let text = "*running,thread-id=\"all\"\n&\"source /tmp/x/cmd.script\\n\"\n~\"42\"\n";
        match split_fence_chunk(text, "source /tmp/x/cmd.script") {
            FenceChunk::Response(r) => assert!(r.contains("42")),
            FenceChunk::AsyncOutput(_) => panic!("expected Response"),
        }
    }

    #[test]
    fn fence_split_without_marker_is_async() {
        let text = "=breakpoint-modified,bkpt={number=\"1\"}\n";
        match split_fence_chunk(text, "source /tmp/x/cmd.script") {
            FenceChunk::AsyncOutput(t) => assert_eq!(t, text),
            FenceChunk::Response(_) => panic!("expected AsyncOutput"),
        }
    }

    #[test]
    fn status_transition_detection() {
        assert_eq!(detect_status_transition("*stopped,reason=\"x\"\nstopped-threads=\"all\"\n"), Some(InferiorState::Stopped));
        assert_eq!(detect_status_transition("*running,thread-id=\"all\"\n"), Some(InferiorState::Running));
        assert_eq!(detect_status_transition("nothing interesting here"), None);
    }

    #[test]
    fn status_transition_picks_the_later_match() {
        let text = "*running,thread-id=\"all\"\n...\nstopped-threads=\"all\"\n";
        assert_eq!(detect_status_transition(text), Some(InferiorState::Stopped));
    }
}
