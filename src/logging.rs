use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "snapsync=debug,info"
    } else {
        "info"
    }
}

/// Initializes logging for a run.
///
/// Sets up two outputs:
/// - Console: compact, human-readable, on stderr
/// - File: appended to `log_file` (created if missing, never rotated)
///
/// `RUST_LOG` overrides the default level.
///
/// Returns a guard that must be kept alive for the duration of the program.
/// Dropping it flushes and stops the file writer.
pub fn init_logging(log_file: &Path, verbose: bool) -> Result<WorkerGuard> {
    let file_name = log_file
        .file_name()
        .with_context(|| format!("LogFile has no file name: {}", log_file.display()))?;
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    // Open once up front so a permission problem is reported as a startup
    // error instead of being swallowed by the background writer.
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open/create log file {}", log_file.display()))?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "info");
        assert!(default_filter(true).contains("debug"));
    }

    #[test]
    fn test_log_file_without_name_is_rejected() {
        assert!(init_logging(Path::new("/"), false).is_err());
    }

    #[test]
    fn test_unwritable_log_location_is_rejected() {
        let temp = tempdir().unwrap();
        // A directory cannot be opened for appending.
        let dir_as_file = temp.path().join("logs");
        std::fs::create_dir(&dir_as_file).unwrap();
        assert!(init_logging(&dir_as_file, false).is_err());
    }
}
