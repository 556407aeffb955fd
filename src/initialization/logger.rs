//! Logger setup for the `recon_mission` binary and embedding applications.

use std::io::Write;

use colored::*;
use log::{Level, LevelFilter};

use crate::config::LogFormat;
use crate::error_handling::InitializationError;

/// Dependencies whose logs are clamped regardless of the requested level.
const QUIET_MODULES: &[(&str, LevelFilter)] = &[
    ("html5ever", LevelFilter::Error),
    ("selectors", LevelFilter::Warn),
    ("rustls", LevelFilter::Warn),
    ("reqwest", LevelFilter::Info),
    ("hyper", LevelFilter::Info),
    ("hickory_proto", LevelFilter::Error),
    ("hickory_resolver", LevelFilter::Warn),
];

/// Installs `env_logger` with mission-friendly formatting.
///
/// `RUST_LOG` is read first; `level` then overrides the global default and
/// this crate's level. Modules of `RUST_LOG` that are not clamped keep their
/// setting.
///
/// # Errors
///
/// Returns `InitializationError::LoggerError` if a logger is already installed.
pub fn init_logger_with(level: LevelFilter, format: LogFormat) -> Result<(), InitializationError> {
    colored::control::set_override(true);

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    for (module, cap) in QUIET_MODULES {
        builder.filter_module(module, *cap);
    }
    builder.filter_module("recon_mission", level);

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                let line = json_line(
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    &record.args().to_string(),
                );
                writeln!(buf, "{line}")
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let (marker, level) = plain_level(record.level());
                writeln!(
                    buf,
                    "{marker} {} [{level}] {}",
                    record.target().cyan(),
                    record.args()
                )
            });
        }
    }

    builder.try_init().map_err(InitializationError::from)?;
    Ok(())
}

/// One structured log line.
fn json_line(ts_millis: i64, level: Level, target: &str, msg: &str) -> String {
    serde_json::json!({
        "ts": ts_millis,
        "level": level.as_str(),
        "target": target,
        "msg": msg,
    })
    .to_string()
}

/// Emoji marker and colored label for a plain line.
fn plain_level(level: Level) -> (&'static str, ColoredString) {
    let label = level.as_str();
    match level {
        Level::Error => ("❌", label.red()),
        Level::Warn => ("⚠️", label.yellow()),
        Level::Info => ("✔️", label.green()),
        Level::Debug => ("🔍", label.blue()),
        Level::Trace => ("🔬", label.purple()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_line_escapes_message() {
        let line = json_line(
            1_700_000_000_000,
            Level::Warn,
            "recon_mission::probe::scheduler",
            "dns: \"timeout\"\nretrying",
        );
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["ts"], 1_700_000_000_000i64);
        assert_eq!(parsed["level"], "WARN");
        assert_eq!(parsed["target"], "recon_mission::probe::scheduler");
        assert_eq!(parsed["msg"], "dns: \"timeout\"\nretrying");
    }

    #[test]
    fn test_plain_level_labels() {
        let (marker, label) = plain_level(Level::Error);
        assert_eq!(marker, "❌");
        assert_eq!(&*label, "ERROR");
        assert_eq!(&*plain_level(Level::Info).1, "INFO");
    }

    #[test]
    fn test_init_logger_is_idempotent() {
        // env_logger can only be installed once per process; a second call
        // must report the error instead of panicking
        let first = init_logger_with(LevelFilter::Info, LogFormat::Plain);
        let second = init_logger_with(LevelFilter::Debug, LogFormat::Json);
        assert!(first.is_err() || second.is_err());
        assert!(matches!(
            second,
            Err(InitializationError::LoggerError(_))
        ));
    }
}
