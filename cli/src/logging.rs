use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub const LOG_FILE_NAME: &str = "rootprompt.log";
const DEFAULT_FILTER: &str = "rootprompt_broker=info,rootprompt_tui=info,rootprompt_cli=info";

/// Installs the file logger. The terminal belongs to the prompt, so nothing
/// is logged there. Keep the guard alive until exit or buffered lines are
/// lost.
pub fn init(log_dir: &Path) -> io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let mut log_file_opts = OpenOptions::new();
    log_file_opts.create(true).append(true);

    // Decisions and requester uids are private to the device owner.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        log_file_opts.mode(0o600);
    }

    let log_file = log_file_opts.open(log_dir.join(LOG_FILE_NAME))?;
    let (non_blocking, guard) = non_blocking(log_file);

    // use RUST_LOG env var, default to info for rootprompt crates.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_ansi(false)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(file_layer).try_init();
    Ok(guard)
}
