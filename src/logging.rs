//! Console plus rolling JSON-file tracing setup.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directive used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_DIRECTIVE: &str = "hitting_scraper=info,warn";

/// Prefix of the daily log files; the appender adds the date suffix.
pub const LOG_FILE_PREFIX: &str = "hitting_scraper.log";

/// Where log files go.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub dir: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
        }
    }
}

impl LogSettings {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

/// Filter from an optional `RUST_LOG`-style directive, falling back to [`DEFAULT_DIRECTIVE`].
pub fn build_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber: human-readable lines on stderr and JSON lines in a
/// daily-rotated file under `settings.dir`.
///
/// The returned guard flushes the file writer on drop; hold it until the process exits.
pub fn init_logging(settings: &LogSettings) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&settings.dir)?;

    let appender = tracing_appender::rolling::daily(&settings.dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let directive = std::env::var("RUST_LOG").ok();
    tracing_subscriber::registry()
        .with(build_filter(directive.as_deref()))
        .with(fmt::layer().json().with_writer(writer))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    Ok(guard)
}
