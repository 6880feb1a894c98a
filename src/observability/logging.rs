//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem from `LogConfig`
//! - Render events as single bracketed lines that log scrapers split on `]`
//! - Route output to the console or an append-only file
//!
//! # Line Format
//! ```text
//! [2026/10/14 09:12:44.031 +00:00] [INFO] [local_log.rs:57] ["Audit Log"] [service-info="{ServiceLabel:...}"]
//! ```
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Each event is formatted into one buffer and written with a single
//!   `write_all`, so a `Mutex<File>` writer never interleaves lines
//! - Log level configurable via config and environment

use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use chrono::Local;
use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

const TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f %:z";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid log level: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("logger already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Event formatter producing `[time] [LEVEL] [file:line] [message] [k=v]...` lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditLogFormat;

impl<S, N> FormatEvent<S, N> for AuditLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let file = meta
            .file()
            .map(|f| f.rsplit(['/', '\\']).next().unwrap_or(f))
            .unwrap_or("<unknown>");

        write!(
            writer,
            "[{}] [{}] [{}:{}]",
            Local::now().format(TIME_FORMAT),
            meta.level(),
            file,
            meta.line().unwrap_or(0)
        )?;

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        write!(writer, " [{}]", quote_if_needed(&fields.message))?;
        for (name, value) in &fields.fields {
            write!(writer, " [{}={}]", name, quote_if_needed(value))?;
        }
        writeln!(writer)
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push((field.name(), format!("{:?}", value)));
        }
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '=' | '[' | ']'))
}

/// Double-quote and escape a value if it would break the bracketed format.
pub fn quote_if_needed(s: &str) -> String {
    if !needs_quotes(s) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Build the writer for the configured sink: the file if set, else stdout.
pub fn make_writer(config: &LogConfig) -> Result<BoxMakeWriter, LoggingError> {
    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::Io {
                    path: path.clone(),
                    source,
                })?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
        None => Ok(BoxMakeWriter::new(std::io::stdout)),
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };
    let writer = make_writer(config)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(AuditLogFormat)
                .with_writer(writer),
        )
        .try_init()?;

    tracing::info!(
        level = %config.level,
        file = config.file.as_deref().unwrap_or("stdout"),
        "Logger initialized"
    );
    Ok(())
}
