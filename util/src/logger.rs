//! Logging setup for the executables
//!
//! All crates log through the `log` facade. Executables call [`logger_init`] once, after the
//! session has been created, which sends every record both to the terminal and to the session's
//! log file.
//!
//! The minimum level can be lowered at run time with the `QUAD_LOG_LEVEL` environment variable
//! (`trace`, `debug`, `info`), for instance to see per-tick controller output on the bench.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use colored::{ColoredString, Colorize};
use log::{info, warn, Level};
use std::env;
use thiserror::Error;

use crate::session::{self, Session};

pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable overriding the minimum log level.
pub const LOG_LEVEL_ENV_VAR: &str = "QUAD_LOG_LEVEL";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The minimum log level must be INFO or lower, found {0}")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Could not open the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// Every line is stamped with the number of seconds since the session epoch. Records below
/// `INFO` also show their target, so per-tick output can be traced to its module.
///
/// Warnings, errors and info must always be logged, so `min_level` may not be above `INFO`.
/// Only one logger can be installed per process.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let env_level = env::var(LOG_LEVEL_ENV_VAR).ok();
    let level = match env_level.as_deref().map(parse_level) {
        Some(Some(l)) => l,
        _ => min_level,
    };

    let log_file =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            let t = session::get_elapsed_seconds();
            let tag = level_tag(record.level());

            if record.level() > Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    t,
                    tag,
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!("[{:10.6} {}] {}", t, tag, message))
            }
        })
        .level(level)
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging to {:?} at {:?}", session.log_file_path, level);
    if let (Some(v), None) = (&env_level, env_level.as_deref().and_then(parse_level)) {
        warn!("Ignoring {}=\"{}\", expected trace, debug or info", LOG_LEVEL_ENV_VAR, v);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse a level name, only accepting levels which keep info and above.
fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.trim().to_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        _ => None,
    }
}

/// Short coloured tag for a level.
fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info => "INF".normal(),
        Level::Warn => "WRN".yellow(),
        Level::Error => "ERR".red().bold(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("TRACE"), Some(LevelFilter::Trace));
        assert_eq!(parse_level(" debug "), Some(LevelFilter::Debug));
        assert_eq!(parse_level("warn"), None);
        assert_eq!(parse_level(""), None);
    }
}
