use pincectl::{console::*, error::*, log, session::Session, settings::Settings, watchers::Event};
use std::io::{self, BufRead, Write};

// Thin demo binary for the console panel contract: attach to a pid given on argv, then forward
// stdin lines through console::handle_input until EOF.
fn main() -> Result<()> {
    let pid: libc::pid_t = match std::env::args().nth(1).and_then(|s| s.parse().ok()) {
        Some(pid) => pid,
        None => {
            eprintln!("usage: pince-console <pid>");
            std::process::exit(2);
        }
    };

    let settings = Settings::default();
    let mut session = Session::attach(pid, &settings)?;

    let stdin = io::stdin();
    print!("(pince) ");
    io::stdout().flush().ok();
    for line in stdin.lock().lines() {
        let line = line?;
        match handle_input(session.gateway(), &line, true, false) {
            Ok(ConsoleOutcome::Cleared) => println!("Cleared"),
            Ok(ConsoleOutcome::Rejected(msg)) => println!("{}", msg),
            Ok(ConsoleOutcome::Forwarded(text)) => println!("{}", text),
            Err(e) => {
                log!(*session.log.lock().unwrap(), "console command failed: {}", e);
                println!("error: {}", e);
            }
        }
        while let Ok(event) = session.events.try_recv() {
            if let Event::AsyncOutput(text) = event {
                println!("{}", text);
            }
        }
        print!("(pince) ");
        io::stdout().flush().ok();
    }

    session.detach();
    Ok(())
}
