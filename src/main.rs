use clap::Parser;
use eddystone_listener::app::{Options, RealScanner, run_with_io};
use eddystone_listener::logging;
use std::panic::{self, PanicHookInfo};

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set up panic hook to ensure clean exit codes for process managers
    // (e.g., systemd) that monitor exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();

    if let Err(why) = logging::init(options.verbose) {
        eprintln!("error: invalid log filter: {why}");
        std::process::exit(EXIT_ERROR);
    }

    let mut stdout = std::io::stdout().lock();
    match run_with_io(options, &RealScanner, &mut stdout).await {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            tracing::error!(error = %why, "exiting");
            std::process::exit(EXIT_ERROR);
        }
    }
}
