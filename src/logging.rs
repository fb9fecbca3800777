//! File-backed tracing setup.
//!
//! The game owns the terminal in raw mode, so log lines go to a file instead
//! of stderr. `RUST_LOG` overrides the default filter.

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_PATH: &str = "/tmp/termfire.log";
/// Owner read/write only
const LOG_MODE: u32 = 0o600;
const DEFAULT_FILTER: &str = "termfire=info";

/// Install the global subscriber. Logging is best effort: if the file cannot be
/// opened the game runs without it.
pub fn init(path: &Path) {
    let file = match OpenOptions::new()
        .create(true)
        .append(true)
        .mode(LOG_MODE)
        .open(path)
    {
        Ok(f) => f,
        Err(_) => return,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init();
}

/// Subscriber for commands that keep the normal terminal (monitor, ports).
pub fn init_stderr() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
