use crate::{*, error::*, gateway::*, log::*, model::*, observer, scripts, settings::*, transport::Transport, watchers::{self, Event, Watchers}, workspace::Workspace};
use libc::pid_t;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Arch {
    Bits32,
    Bits64,
}

// Cross-cutting session lifecycle: owns the workspace, transport, observer, gateway, and watcher
// set for exactly one attached target. Exactly one `Session` is ever live per process.
pub struct Session {
    pid: pid_t,
    gateway: Gateway,
    shared: Arc<observer::Shared>,
    observer: observer::Observer,
    watchers: Watchers,
    arch: Arch,
    pub log: Arc<Mutex<Log>>,
    pub events: Receiver<Event>,
}

impl Session {
    pub fn attach(pid: pid_t, settings: &Settings) -> Result<Session> {
        let workspace = Workspace::create(pid, settings.workspace_root.as_deref())?;
        let transport = Transport::spawn(&settings.debugger_path, settings.use_sudo)?;

        let shared = observer::Shared::new();
        let (async_tx, async_rx): (Sender<String>, Receiver<String>) = watchers::new_async_channel();
        let master_for_observer = transport.try_clone_master()?;
        let obs = observer::spawn(master_for_observer, &workspace.cmd_script_path(), shared.clone(), async_tx, settings.trace_logging);

        let gateway = Gateway::new(pid, transport, workspace, shared.clone());
        let log = Arc::new(Mutex::new(Log::new()));

        // initial prompt has already been consumed by the observer's fence logic by the time the
        // first send_command call blocks on it, so no separate "wait for prompt" step is needed
        // here beyond issuing the first command.
        let log_path = gateway.workspace_async_log_path();
        gateway.send_command(&format!("set logging file {}", log_path.to_string_lossy()), CommandOptions {cli_output: true, ..Default::default()})?;
        gateway.send_command("set logging on", CommandOptions {cli_output: true, ..Default::default()})?;
        gateway.send_command(&format!("attach {}", pid), CommandOptions {cli_output: true, ..Default::default()})?;

        let host_dir = std::env::current_dir().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
        gateway.send_command(&format!("set $PINCE_PATH=\"{}\"", host_dir), CommandOptions {cli_output: true, ..Default::default()})?;
        gateway.send_command("source gdb_python_scripts/GDBCommandExtensions.py", CommandOptions {cli_output: true, ..Default::default()})?;

        let arch = probe_arch(&gateway)?;

        gateway.send_command("c", CommandOptions {cli_output: true, ..Default::default()})?;

        let (events_tx, events_rx) = std::sync::mpsc::channel();
        let watchers = Watchers::spawn(pid, shared.clone(), async_rx, settings.clone(), log.clone(), events_tx);

        Ok(Session {pid, gateway, shared, observer: obs, watchers, arch, log, events: events_rx})
    }

    pub fn pid(&self) -> pid_t { self.pid }
    pub fn arch(&self) -> Arch { self.arch }
    pub fn gateway(&self) -> &Gateway { &self.gateway }
    pub fn state(&self) -> InferiorState { *self.shared.state.lock().unwrap() }

    // Ctrl-D, then let Drop tear the rest down. Idempotent: a second call is a harmless no-op
    // send through a gateway that's already refusing non-control traffic post-detach in practice
    // (the transport itself may already be gone), so failures here are swallowed rather than
    // propagated.
    pub fn detach(&mut self) {
        let _ = self.gateway.send_eof();
        self.watchers.stop();
        self.observer.stop();
    }
}

fn probe_arch(gateway: &Gateway) -> Result<Arch> {
    match scripts::parse_convenience_variables(gateway, &["$rax".to_string()])? {
        None => Ok(Arch::Bits64),
        Some(values) => {
            if values.first().map(String::as_str) == Some("void") {
                Ok(Arch::Bits32)
            } else {
                Ok(Arch::Bits64)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arch_equality() {
        assert_eq!(Arch::Bits64, Arch::Bits64);
        assert_ne!(Arch::Bits32, Arch::Bits64);
    }
}
