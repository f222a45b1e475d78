//! Logger initialization.
//!
//! Logs always go to stderr: the CLI prints lookup answers and `info` JSON on
//! stdout, and scripts read that stream.

use std::io::Write;

use colored::{ColoredString, Colorize};
use env_logger::{fmt::Formatter, Target};
use log::{Level, LevelFilter, Record};

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Installs the process logger.
///
/// `level` applies to this crate and overrides `RUST_LOG` for it; HTTP
/// client internals stay at `info` unless `RUST_LOG` asks otherwise.
///
/// - `Plain`: `HH:MM:SS LEVEL target: message`, colored when stderr is a
///   terminal
/// - `Json`: one object per line with `ts` (Unix millis), `level`, `target`
///   and `msg`
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
///
/// # Examples
///
/// ```bash
/// # Trace every record read and update request
/// country_lookup --log-level debug lookup 8.8.8.8
///
/// # Machine-readable logs from the watcher
/// country_lookup --log-format json watch
/// ```
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder
        .target(Target::Stderr)
        .filter_level(level)
        .filter_module("reqwest", LevelFilter::Info)
        .filter_module("hyper", LevelFilter::Info)
        .filter_module("hyper_util", LevelFilter::Info)
        .filter_module("country_lookup", level);

    match format {
        LogFormat::Json => builder.format(write_json),
        LogFormat::Plain => builder.format(write_plain),
    };

    builder.try_init()?;
    Ok(())
}

fn write_plain(buf: &mut Formatter, record: &Record<'_>) -> std::io::Result<()> {
    writeln!(
        buf,
        "{} {:<5} {}: {}",
        chrono::Local::now().format("%H:%M:%S"),
        level_label(record.level()),
        record.target().dimmed(),
        record.args()
    )
}

fn write_json(buf: &mut Formatter, record: &Record<'_>) -> std::io::Result<()> {
    let line = serde_json::json!({
        "ts": chrono::Utc::now().timestamp_millis(),
        "level": record.level().as_str(),
        "target": record.target(),
        "msg": record.args().to_string(),
    });
    writeln!(buf, "{}", line)
}

fn level_label(level: Level) -> ColoredString {
    let label = level.as_str();
    match level {
        Level::Error => label.red().bold(),
        Level::Warn => label.yellow(),
        Level::Info => label.green(),
        Level::Debug => label.blue(),
        Level::Trace => label.normal(),
    }
}
