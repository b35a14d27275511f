//! Logging configuration and initialization
//!
//! Every ADN binary installs its `tracing` subscriber through [`init_logging`].
//! Output can go to the console, to a daily-rotated file, or both, in either
//! human-readable text or JSON.
//!
//! Components never print directly; they log with structured fields:
//!
//! ```rust
//! use tracing::{info, warn};
//!
//! let (batch_key, lane) = (7u64, 2usize);
//! info!(batch_key, lane, "Batch flushed");
//! warn!(remaining_batches = 3, "Deadline reached before drain completed");
//! ```
//!
//! # Example
//!
//! ```no_run
//! use adn_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::for_binary("adn-ingest")
//!         .with_level(LogLevel::Debug)
//!         .merge_env()?;
//!     // Keep the guard alive so buffered file output is flushed on exit
//!     let _guard = init_logging(&config)?;
//!     Ok(())
//! }
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::env;

/// Lowercase keyword enums settable from `LOG_*` variables.
///
/// The first spelling of each variant is canonical; the rest are accepted
/// aliases.
macro_rules! keyword_enum {
    ($name:ident { $($variant:ident => [$canonical:literal $(, $alias:literal)*]),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $canonical,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($canonical $(| $alias)* => Ok($name::$variant),)+
                    other => Err(format!(
                        "unknown {} '{}', expected one of: {}",
                        stringify!($name),
                        other,
                        [$($canonical),+].join(", ")
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Minimum level that is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

keyword_enum!(LogLevel {
    Trace => ["trace"],
    Debug => ["debug"],
    Info => ["info"],
    Warn => ["warn", "warning"],
    Error => ["error"],
});

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

keyword_enum!(LogOutput {
    Console => ["console", "stdout"],
    File => ["file"],
    Both => ["both", "all"],
});

impl LogOutput {
    fn to_console(self) -> bool {
        self != LogOutput::File
    }

    fn to_file(self) -> bool {
        self != LogOutput::Console
    }
}

/// Line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

keyword_enum!(LogFormat {
    Text => ["text", "pretty"],
    Json => ["json"],
});

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub output: LogOutput,
    pub format: LogFormat,

    /// Directory for rotated log files, used when output includes a file
    pub log_dir: PathBuf,

    /// Rotated file name prefix ("adn-server" -> "adn-server.2026-01-18")
    pub log_file_prefix: String,

    /// Extra comma-separated directives, e.g. "reqwest=warn,adn_ingest=debug"
    pub filter_directives: Option<String>,

    pub include_location: bool,
    pub include_thread_ids: bool,
    pub include_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::for_binary("adn")
    }
}

impl LogConfig {
    /// Defaults for one binary: info level on the console, files named
    /// after the binary under `./logs`
    pub fn for_binary(name: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            output: LogOutput::Console,
            format: LogFormat::Text,
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: name.into(),
            filter_directives: None,
            include_location: false,
            include_thread_ids: false,
            include_targets: true,
        }
    }

    /// Defaults overridden by any `LOG_*` variables
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_env()
    }

    /// Override fields with the `LOG_*` variables that are set:
    /// `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR`, `LOG_FILE_PREFIX`,
    /// `LOG_FILTER`, `LOG_INCLUDE_LOCATION`, `LOG_INCLUDE_THREAD_IDS` and
    /// `LOG_INCLUDE_TARGETS`.
    pub fn merge_env(self) -> crate::Result<Self> {
        Ok(Self {
            level: env::parse_or("LOG_LEVEL", self.level)?,
            output: env::parse_or("LOG_OUTPUT", self.output)?,
            format: env::parse_or("LOG_FORMAT", self.format)?,
            log_dir: env::parse_or("LOG_DIR", self.log_dir)?,
            log_file_prefix: env::string_or("LOG_FILE_PREFIX", &self.log_file_prefix),
            filter_directives: env::parse("LOG_FILTER")?.or(self.filter_directives),
            include_location: env::parse_or("LOG_INCLUDE_LOCATION", self.include_location)?,
            include_thread_ids: env::parse_or("LOG_INCLUDE_THREAD_IDS", self.include_thread_ids)?,
            include_targets: env::parse_or("LOG_INCLUDE_TARGETS", self.include_targets)?,
        })
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Append directives to the ones already configured
    pub fn with_filter_directives(mut self, directives: &str) -> Self {
        self.filter_directives = match self.filter_directives.take() {
            Some(existing) => Some(format!("{existing},{directives}")),
            None => Some(directives.to_string()),
        };
        self
    }

    fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        let base = EnvFilter::from_default_env().add_directive(Level::from(self.level).into());

        self.filter_directives
            .iter()
            .flat_map(|directives| directives.split(','))
            .map(str::trim)
            .filter(|directive| !directive.is_empty())
            .try_fold(base, |filter, directive| {
                let parsed: Directive = directive
                    .parse()
                    .with_context(|| format!("Invalid log filter directive '{directive}'"))?;
                Ok(filter.add_directive(parsed))
            })
    }
}

/// Keeps the non-blocking file writer alive; drop it last.
#[must_use = "dropping the guard stops background log file writes"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn fmt_layer<W>(config: &LogConfig, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(config.include_targets)
        .with_thread_ids(config.include_thread_ids)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(FmtSpan::CLOSE);

    match config.format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Install the global subscriber. Call once, at startup.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<LoggingGuard> {
    let filter = config.env_filter()?;
    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    let mut file_guard = None;

    if config.output.to_console() {
        layers.push(fmt_layer(config, std::io::stdout, true));
    }

    if config.output.to_file() {
        std::fs::create_dir_all(&config.log_dir).with_context(|| {
            format!("Cannot create log directory {}", config.log_dir.display())
        })?;
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
            &config.log_dir,
            &config.log_file_prefix,
        ));
        file_guard = Some(guard);
        layers.push(fmt_layer(config, writer, false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
