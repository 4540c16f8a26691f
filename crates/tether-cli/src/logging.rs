//! Logging setup for the `tether` binary
//!
//! Console output goes to stderr so that tables and JSON printed on stdout
//! stay machine readable. A daily-rotated JSON log file can be enabled on top.
//! `RUST_LOG` takes precedence over the built-in filter.

use clap::ValueEnum;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const LOG_FILE_NAME: &str = "tether.log";

/// Console log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files are written
    pub log_dir: PathBuf,

    pub console_format: LogFormat,

    /// Also write JSON logs to a rotated file in `log_dir`
    pub enable_file_logs: bool,

    /// Include file/line information in console output
    pub include_location: bool,

    /// Log span open/close (shows probe and reconnect timings)
    pub enable_spans: bool,

    /// Filter used when `RUST_LOG` is not set
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: log_directory(),
            console_format: LogFormat::Pretty,
            enable_file_logs: false,
            include_location: cfg!(debug_assertions),
            enable_spans: false,
            default_filter: "warn,tether_cli=info,tether_connection=info,tether_drivers=info,tether_driver_mysql=info,tether_core=info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Configuration for `--verbose`: debug output from every tether crate
    pub fn verbose() -> Self {
        Self {
            enable_spans: true,
            default_filter: "info,tether_cli=debug,tether_connection=debug,tether_drivers=debug,tether_driver_mysql=debug,tether_core=debug".to_string(),
            ..Self::default()
        }
    }

    pub fn with_console_format(mut self, format: LogFormat) -> Self {
        self.console_format = format;
        self
    }

    pub fn with_file_logs(mut self, enabled: bool) -> Self {
        self.enable_file_logs = enabled;
        self
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped, so keep it alive
/// until the process exits.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    // NEW fires once when the span is created; ENTER would fire on every async
    // re-poll.
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();

    let console_layer = match config.console_format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_ansi(true)
            .pretty()
            .with_filter(env_filter.clone())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(span_events.clone())
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_filter(env_filter.clone())
            .boxed(),
    };
    layers.push(console_layer);

    let mut guard = None;
    if config.enable_file_logs {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_NAME);
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();

        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        file_logs = config.enable_file_logs,
        format = ?config.console_format,
        "Logging initialized"
    );

    Ok(guard)
}

/// `<data_local_dir>/tether/logs`
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tether")
        .join("logs")
}
