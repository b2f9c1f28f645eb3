//! Process-wide structured logging.
//!
//! JSON lines go to stderr and, when configured, are appended to a log file. The file writer is
//! non-blocking; the returned [`LogGuard`] flushes it when dropped, so hold it until the process
//! exits.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::Result;
use crate::error::Error;

/// Environment variable holding the `EnvFilter` directives.
pub const LOG_ENV_VAR: &str = "CAPTION_BATCH_LOG";

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Append-only log file. Parent directories are created.
    pub file: Option<PathBuf>,
}

/// Keeps the background log writer alive. Dropping it flushes pending lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// Defaults to `info` unless overridden by `CAPTION_BATCH_LOG`. Calling this again after a
/// subscriber is installed is a no-op, unless a log file is requested: that file could never be
/// attached, so it is an error.
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_append(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    match (installed, &config.file) {
        (Err(err), Some(path)) => Err(Error::msg(format!(
            "cannot log to {}: {err}",
            path.display()
        ))),
        _ => Ok(LogGuard { _file: guard }),
    }
}

fn open_append(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }

    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| Error::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so every step that depends
    // on install order lives in this one test.
    #[test]
    fn init_installs_once_and_rejects_late_log_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("logs").join("batch.log");
        std::fs::create_dir_all(path.parent().expect("parent"))?;
        std::fs::write(&path, "earlier run\n")?;

        let _guard = init(&LogConfig {
            file: Some(path.clone()),
        })?;
        assert!(std::fs::read_to_string(&path)?.starts_with("earlier run\n"));

        let _again = init(&LogConfig::default())?;

        let late = dir.path().join("late.log");
        let err = match init(&LogConfig {
            file: Some(late.clone()),
        }) {
            Ok(_) => panic!("expected a late log file to be rejected"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("late.log"));
        Ok(())
    }
}
