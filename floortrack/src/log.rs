//! Tracing initialization.
//!
//! One entry point for both console and file logging. `RUST_LOG` always
//! wins over the verbosity-derived default filter.

use std::path::Path;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

const TIME_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

/// Errors initializing the tracing subscriber.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log timestamp format: {0}")]
    TimeFormat(String),

    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Install the global tracing subscriber.
///
/// Verbosity maps to a default filter (`0` → info, `1` → debug, `2+` →
/// trace). With a log directory, output goes to a daily-rolling file
/// through a non-blocking writer; the returned guard must be held for the
/// process lifetime or buffered lines are lost on exit.
pub fn init_tracing(verbosity: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, LogError> {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let format = time::format_description::parse(TIME_FORMAT)
        .map_err(|e| LogError::TimeFormat(e.to_string()))?;
    let timer = LocalTime::new(format);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "floortrack.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_timer(timer)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| LogError::Init(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_timer(timer)
                .try_init()
                .map_err(|e| LogError::Init(e.to_string()))?;
            Ok(None)
        }
    }
}
