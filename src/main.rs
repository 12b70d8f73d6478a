use clap::Parser;
use dirsort::cli::{Cli, RunStatus, interrupted, run};
use dirsort::output::OutputFormatter;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn main() {
    let cli = Cli::parse();

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, finishing the current file...");
        flag.store(true, Ordering::SeqCst);
    }) {
        OutputFormatter::warning(&format!("Could not install Ctrl-C handler: {}", e));
    }

    let code = match run(&cli, Arc::clone(&interrupt)) {
        Ok(_) if interrupted(&interrupt) => RunStatus::Interrupted.exit_code(),
        Ok(status) => status.exit_code(),
        Err(e) => {
            tracing::error!("{}", e);
            OutputFormatter::error(&e.to_string());
            RunStatus::Failed.exit_code()
        }
    };
    process::exit(code);
}
