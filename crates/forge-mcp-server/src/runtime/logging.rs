//! Logging config and utilities
//!
//! Logs never go to standard output: in stdio mode it carries the MCP protocol.

mod defaults;
mod format_style;
mod log_rotation_kind;
mod parsers;

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer as LayerTrait, Registry};

pub use format_style::FormatStyle;
pub use log_rotation_kind::LogRotationKind;

const LOG_FILE_PREFIX: &str = "forge_mcp_server";

/// Logging related options
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct Logging {
    /// The log level to use for tracing
    #[serde(
        default = "defaults::log_level",
        deserialize_with = "parsers::from_str"
    )]
    #[schemars(schema_with = "level")]
    pub level: Level,

    /// Directory to write rolling log files to instead of standard error
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Log file rotation period to use when a log path is provided
    /// [default: Hourly]
    #[serde(default = "defaults::default_rotation")]
    pub rotation: LogRotationKind,

    #[serde(default)]
    pub format: FormatStyle,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            path: None,
            rotation: defaults::default_rotation(),
            format: Default::default(),
        }
    }
}

type LoggingLayerResult = (
    Box<dyn LayerTrait<Registry> + Send + Sync>,
    Option<WorkerGuard>,
);

pub struct LoggingLayerBuilder {
    writer: Option<BoxMakeWriter>,
    worker_guard: Option<WorkerGuard>,
    ansi_enabled: bool,
}

impl Default for LoggingLayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingLayerBuilder {
    pub fn new() -> Self {
        Self {
            writer: None,
            worker_guard: None,
            ansi_enabled: false,
        }
    }

    /// Use `mw` instead of the writer derived from the logging options
    pub fn with_writer<W>(mut self, mw: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        self.writer = Some(BoxMakeWriter::new(mw));
        self
    }

    pub fn with_ansi_enabled(mut self, enabled: bool) -> Self {
        self.ansi_enabled = enabled;
        self
    }

    pub fn build(mut self, logging: &Logging) -> Result<LoggingLayerResult, anyhow::Error> {
        if self.writer.is_none() {
            let (writer, guard, with_ansi) = self.build_writer(logging);
            self.writer = Some(writer);
            self.worker_guard = guard;
            self.ansi_enabled = with_ansi;
        }

        let Some(writer) = self.writer else {
            return Err(anyhow::Error::msg("No log writer set"));
        };

        let layer = tracing_subscriber::fmt::layer();
        let formatted_layer = match logging.format {
            FormatStyle::Full => layer
                .with_writer(writer)
                .with_ansi(self.ansi_enabled)
                .with_target(false)
                .boxed(),
            FormatStyle::Compact => layer
                .compact()
                .with_writer(writer)
                .with_ansi(self.ansi_enabled)
                .with_target(false)
                .boxed(),
            FormatStyle::Json => layer
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .boxed(),
            FormatStyle::Pretty => layer
                .pretty()
                .with_writer(writer)
                .with_ansi(self.ansi_enabled)
                .with_target(false)
                .boxed(),
        };

        Ok((formatted_layer, self.worker_guard))
    }

    /// The rolling file writer when `path` is set and usable, stderr otherwise
    fn build_writer(&self, logging: &Logging) -> (BoxMakeWriter, Option<WorkerGuard>, bool) {
        let Some(path) = logging.path.as_deref() else {
            return (BoxMakeWriter::new(std::io::stderr), None, true);
        };

        match file_writer(path, &logging.rotation) {
            Ok((writer, guard)) => (writer, Some(guard), false),
            Err(e) => {
                eprintln!("Failed to set up log file in {}: {e}", path.display());
                eprintln!("Falling back to stderr");
                (BoxMakeWriter::new(std::io::stderr), None, true)
            }
        }
    }
}

fn file_writer(
    directory: &Path,
    rotation: &LogRotationKind,
) -> Result<(BoxMakeWriter, WorkerGuard), anyhow::Error> {
    std::fs::create_dir_all(directory)?;
    let appender = RollingFileAppender::builder()
        .rotation(rotation.clone().into())
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(directory)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    Ok((BoxMakeWriter::new(non_blocking), guard))
}

impl Logging {
    /// Debug mode forces the level to at least DEBUG
    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug && self.level < Level::DEBUG {
            self.level = Level::DEBUG;
        }
        self
    }

    pub fn env_filter(logging: &Logging) -> Result<EnvFilter, anyhow::Error> {
        let mut env_filter = EnvFilter::from_default_env().add_directive(logging.level.into());

        if logging.level == Level::INFO {
            env_filter = env_filter.add_directive("rmcp=warn".parse()?);
        }
        Ok(env_filter)
    }
}

fn level(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    /// Log level
    #[derive(JsonSchema)]
    #[schemars(rename_all = "lowercase")]
    #[allow(dead_code)]
    enum Level {
        Trace,
        Debug,
        Info,
        Warn,
        Error,
    }

    Level::json_schema(generator)
}
