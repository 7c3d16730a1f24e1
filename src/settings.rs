use std::path::PathBuf;

// One plain struct threaded through by reference, no globals, no config file parser — just
// struct fields with sane defaults. GUI-side settings dialogs are out of scope here.
#[derive(Clone, Debug)]
pub struct Settings {
    // Path (or bare name, resolved via $PATH) of the debugger subprocess to spawn.
    pub debugger_path: String,
    // Whether to prefix the spawn with `sudo`. Needed to PTRACE_SEIZE processes we don't own.
    pub use_sudo: bool,
    // How often (in nanoseconds) the process_events-equivalent loop re-checks liveness
    // and the address-table refresher ticks, when not overridden per-call.
    pub periodic_timer_ns: u64,
    // Address-table auto-refresh: enabled flag and interval in fractional seconds.
    // 0.0 means "as fast as possible"; (0.0, 0.1) is unusually fast and gets a one-time warning.
    pub auto_update: bool,
    pub refresh_interval_secs: f64,
    // Verbose eprintln!() tracing of state transitions, matching debugger.rs's trace_logging flag.
    pub trace_logging: bool,
    // Directory the workspace (C2) is created under. Defaults to the OS temp dir.
    pub workspace_root: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            debugger_path: "gdb".to_string(),
            use_sudo: true,
            periodic_timer_ns: 250_000_000,
            auto_update: true,
            refresh_interval_secs: 1.0,
            trace_logging: false,
            workspace_root: None,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RefreshRate {
    Normal(f64),
    TooFast(f64),
    AsFastAsPossible,
}

impl Settings {
    pub fn refresh_rate(&self) -> RefreshRate {
        classify_refresh_interval(self.refresh_interval_secs)
    }
}

pub fn classify_refresh_interval(secs: f64) -> RefreshRate {
    if secs <= 0.0 {
        RefreshRate::AsFastAsPossible
    } else if secs < 0.1 {
        RefreshRate::TooFast(secs)
    } else {
        RefreshRate::Normal(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_interval_classification() {
        assert_eq!(classify_refresh_interval(0.0), RefreshRate::AsFastAsPossible);
        assert_eq!(classify_refresh_interval(0.05), RefreshRate::TooFast(0.05));
        assert_eq!(classify_refresh_interval(0.1), RefreshRate::Normal(0.1));
        assert_eq!(classify_refresh_interval(1.0), RefreshRate::Normal(1.0));
    }
}
