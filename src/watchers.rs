use crate::{*, log::*, model::*, observer, procfs, settings::*};
use libc::pid_t;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

// C9: the four cooperative watcher loops. None of them ever touches the gateway lock; they only
// read `observer::Shared` and the process table, and publish onto one shared event channel.
#[derive(Debug, Clone)]
pub enum Event {
    Exited,
    Stopped,
    Running,
    AsyncOutput(String),
    Refresh,
}

pub struct Watchers {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Watchers {
    pub fn spawn(
        pid: pid_t,
        shared: Arc<observer::Shared>,
        async_rx: Receiver<String>,
        settings: Settings,
        log: Arc<Mutex<Log>>,
        events: Sender<Event>,
    ) -> Watchers {
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();

        handles.push(spawn_exit_watcher(pid, stop.clone(), events.clone()));
        handles.push(spawn_status_watcher(shared.clone(), stop.clone(), events.clone()));
        handles.push(spawn_async_output_watcher(async_rx, events.clone()));
        handles.push(spawn_refresher(shared, stop.clone(), settings, log, events));

        Watchers {stop, handles}
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for Watchers {
    fn drop(&mut self) {
        self.stop();
        for h in self.handles.drain(..) {
            let _ = h.join();
        }
    }
}

fn spawn_exit_watcher(pid: pid_t, stop: Arc<AtomicBool>, events: Sender<Event>) -> JoinHandle<()> {
    thread::Builder::new().name("exit-watcher".to_string()).spawn(move || {
        while !stop.load(Ordering::SeqCst) {
            if !procfs::is_process_valid(pid) {
                let _ = events.send(Event::Exited);
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }).expect("failed to spawn exit watcher")
}

fn spawn_status_watcher(shared: Arc<observer::Shared>, stop: Arc<AtomicBool>, events: Sender<Event>) -> JoinHandle<()> {
    thread::Builder::new().name("status-watcher".to_string()).spawn(move || {
        let mut last = InferiorState::Unknown;
        loop {
            if stop.load(Ordering::SeqCst) {
                return;
            }
            let guard = shared.state.lock().unwrap();
            let (guard, _) = shared.state_cv.wait_timeout(guard, Duration::from_millis(200)).unwrap();
            let current = *guard;
            drop(guard);
            if current != last {
                last = current;
                let event = match current {
                    InferiorState::Stopped => Some(Event::Stopped),
                    InferiorState::Running => Some(Event::Running),
                    InferiorState::Unknown | InferiorState::Exited => None,
                };
                if let Some(e) = event {
                    let _ = events.send(e);
                }
            }
        }
    }).expect("failed to spawn status watcher")
}

fn spawn_async_output_watcher(async_rx: Receiver<String>, events: Sender<Event>) -> JoinHandle<()> {
    thread::Builder::new().name("async-output-watcher".to_string()).spawn(move || {
        for text in async_rx.iter() {
            let _ = events.send(Event::AsyncOutput(text));
        }
    }).expect("failed to spawn async-output watcher")
}

fn spawn_refresher(shared: Arc<observer::Shared>, stop: Arc<AtomicBool>, settings: Settings, log: Arc<Mutex<Log>>, events: Sender<Event>) -> JoinHandle<()> {
    thread::Builder::new().name("address-table-refresher".to_string()).spawn(move || {
        if let RefreshRate::TooFast(secs) = settings.refresh_rate() {
            log!(*log.lock().unwrap(), "refresh interval {}s is unusually fast", secs);
        }
        while !stop.load(Ordering::SeqCst) {
            if !settings.auto_update {
                thread::sleep(Duration::from_millis(100));
                continue;
            }
            let sleep_for = match settings.refresh_rate() {
                RefreshRate::AsFastAsPossible => Duration::from_millis(1),
                RefreshRate::TooFast(secs) | RefreshRate::Normal(secs) => Duration::from_secs_f64(secs),
            };
            thread::sleep(sleep_for);
            if *shared.state.lock().unwrap() == InferiorState::Stopped {
                let _ = events.send(Event::Refresh);
            }
        }
    }).expect("failed to spawn address-table refresher")
}

pub fn new_async_channel() -> (Sender<String>, Receiver<String>) {
    mpsc::channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn async_output_watcher_forwards_every_message() {
        let (tx, rx) = mpsc::channel();
        let (events_tx, events_rx) = mpsc::channel();
        tx.send("async line 1".to_string()).unwrap();
        tx.send("async line 2".to_string()).unwrap();
        drop(tx);
        let handle = spawn_async_output_watcher(rx, events_tx);
        handle.join().unwrap();

        let mut lines = Vec::new();
        while let Ok(Event::AsyncOutput(text)) = events_rx.try_recv() {
            lines.push(text);
        }
        assert_eq!(lines, vec!["async line 1", "async line 2"]);
    }

    #[test]
    fn exit_watcher_fires_once_for_a_dead_pid() {
        let (events_tx, events_rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_exit_watcher(i32::MAX - 1, stop, events_tx);
        handle.join().unwrap();
        assert!(matches!(events_rx.try_recv(), Ok(Event::Exited)));
    }
}
