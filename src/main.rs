//! Process entry point: init logging, parse arguments, load the recipe,
//! bind the netfilter queue, and run the driver loop until `SIGINT` (§10.4).

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ops_inject::cli::Cli;
use ops_inject::driver::process_packet;
use ops_inject::error::{QueueError, StartupError};
use ops_inject::queue::{NfqBridge, QueueBridge};
use ops_inject::recipe::Recipe;

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_signum: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Installs a bare `SIGINT` handler so the blocking queue read is
/// interrupted (returning `EINTR`) rather than swallowing the signal.
fn install_sigint_handler() -> Result<(), StartupError> {
    // SAFETY: the handler only stores to a `SeqCst` atomic, which is
    // async-signal-safe; SIGINT and the function pointer are both valid
    // for the lifetime of the process.
    let prev = unsafe { libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t) };
    if prev == libc::SIG_ERR {
        return Err(StartupError::Signal(std::io::Error::last_os_error()));
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "startup failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), StartupError> {
    let cli = Cli::parse();
    let recipe_path = cli.recipe_path.clone();
    let config = cli.into_config()?;
    let recipe = Recipe::load(&recipe_path)?;

    install_sigint_handler()?;
    let mut bridge = NfqBridge::open(config.queue)?;
    tracing::info!(queue = config.queue, protocol = ?config.protocol, "ops-inject running");

    loop {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            tracing::info!("shutdown requested, exiting cleanly");
            break;
        }

        let raw = match bridge.recv() {
            Ok(raw) => raw,
            Err(QueueError::Interrupted) => {
                tracing::info!("shutdown requested, exiting cleanly");
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "queue socket failed, shutting down");
                break;
            }
        };

        let verdict = process_packet(&config, &recipe, &raw);
        if let Err(err) = bridge.post_verdict(verdict) {
            tracing::error!(error = %err, "failed to post verdict, shutting down");
            break;
        }
    }

    Ok(())
}
