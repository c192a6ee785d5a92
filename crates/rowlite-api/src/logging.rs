//! Logging configuration for RowLite
//!
//! Logging uses the `tracing` framework, with a level filter, a choice
//! of output format, and optional daily-rotated log files.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default file name when the configured path has none
const DEFAULT_LOG_FILE: &str = "rowlite.log";

/// Log output destination
#[derive(Debug, Clone)]
pub enum LogOutput {
    /// Output to stdout
    Stdout,
    /// Output to a file with daily rotation
    File(PathBuf),
    /// Output to both stdout and file
    Both(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// Human-readable multi-line format (default)
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level filter, in `EnvFilter` syntax
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    /// Create config with info level and stdout output
    pub fn info() -> Self {
        Self::default()
    }

    /// Create config with debug level, which logs every row mutation
    pub fn debug() -> Self {
        Self::default().with_level("debug")
    }

    /// Create config with warn level, which still reports skipped rows
    pub fn warn() -> Self {
        Self::default().with_level("warn")
    }

    /// Set log output to file with rotation
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Set log output to both stdout and file
    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set log level filter
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    /// `RUST_LOG` wins over the configured level.
    fn env_filter(&self) -> EnvFilter {
        self.filter_with(EnvFilter::try_from_default_env().ok())
    }

    /// Filter from an environment override or the configured level; an
    /// unparsable level falls back to `info`.
    fn filter_with(&self, from_env: Option<EnvFilter>) -> EnvFilter {
        from_env
            .or_else(|| EnvFilter::try_new(&self.level).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }

    /// Initialize global logging with this configuration
    ///
    /// Returns a guard when logging to a file; it must be kept alive, since
    /// dropping it shuts down the background writer. If a global subscriber
    /// is already installed, this configuration is ignored.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use rowlite::logging::LogConfig;
    ///
    /// // Keep the guard alive for the lifetime of your application
    /// let _guard = LogConfig::info().init();
    /// ```
    pub fn init(self) -> Option<WorkerGuard> {
        let filter = self.env_filter();
        let registry = tracing_subscriber::registry().with(filter);

        match (self.output, self.format) {
            (LogOutput::Stdout, LogFormat::Pretty) => {
                let _ = registry.with(fmt::layer().pretty()).try_init();
                None
            }
            (LogOutput::Stdout, LogFormat::Compact) => {
                let _ = registry.with(fmt::layer().compact()).try_init();
                None
            }
            (LogOutput::File(path), LogFormat::Pretty) => {
                let (writer, guard) = file_writer(&path);
                let _ = registry
                    .with(fmt::layer().with_writer(writer).with_ansi(false).pretty())
                    .try_init();
                Some(guard)
            }
            (LogOutput::File(path), LogFormat::Compact) => {
                let (writer, guard) = file_writer(&path);
                let _ = registry
                    .with(fmt::layer().with_writer(writer).with_ansi(false).compact())
                    .try_init();
                Some(guard)
            }
            (LogOutput::Both(path), _) => {
                let (writer, guard) = file_writer(&path);
                // Both outputs share the default format
                let _ = registry
                    .with(fmt::layer())
                    .with(fmt::layer().with_writer(writer).with_ansi(false))
                    .try_init();
                Some(guard)
            }
        }
    }
}

/// Non-blocking writer for a daily-rolling log file at `path`
fn file_writer(path: &Path) -> (NonBlocking, WorkerGuard) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name))
}
