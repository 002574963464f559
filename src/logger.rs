//! Tracing subscriber setup for the folio-bot server.
//!
//! `main` resolves one level string (a `-v` flag, then `FOLIO_LOG_LEVEL`,
//! then `server.log_level`) and calls [`init`] once with it.

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::AppError;

/// Targets a bare level applies to. Everything else stays at `warn` or
/// quieter, so `-vvv` shows our request flow without hyper internals.
const OWN_TARGETS: &[&str] = &["folio_bot", "tower_http"];

/// Install the global subscriber.
///
/// `prefer_level` is set when the level came from `-v` flags; it then beats
/// `RUST_LOG`. A configured level loses to `RUST_LOG`.
///
/// Lines go to stderr, or are appended to `log_file` when one is configured.
pub fn init(level: &str, prefer_level: bool, log_file: Option<&Path>) -> Result<(), AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(level, prefer_level, rust_log.as_deref())?;

    let writer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    AppError::Logger(format!("failed to open log file '{}': {e}", path.display()))
                })?;
            BoxMakeWriter::new(file)
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Pick the filter from our level and an optional `RUST_LOG` value.
fn build_filter(
    level: &str,
    prefer_level: bool,
    rust_log: Option<&str>,
) -> Result<EnvFilter, AppError> {
    let from_env = || match rust_log {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| AppError::Logger(format!("invalid RUST_LOG '{directives}': {e}"))),
        None => Err(AppError::Logger("RUST_LOG not set".into())),
    };
    let from_level = || -> Result<EnvFilter, AppError> {
        EnvFilter::try_new(directives_for(level)?)
            .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))
    };

    if prefer_level {
        from_level().or_else(|level_err| {
            from_env().map_err(|env_err| AppError::Logger(format!("{level_err}; {env_err}")))
        })
    } else {
        from_env().or_else(|_| from_level())
    }
}

/// Expand a bare level such as `debug` into per-target directives. Anything
/// containing `=` or `,` is taken as a full `EnvFilter` directive string.
fn directives_for(level: &str) -> Result<String, AppError> {
    if level.contains(['=', ',']) {
        return Ok(level.to_string());
    }
    let own = parse_level(level)?;
    let mut directives = vec![own.min(LevelFilter::WARN).to_string()];
    directives.extend(OWN_TARGETS.iter().map(|t| format!("{t}={own}")));
    Ok(directives.join(","))
}

/// Parse a single level word (`error` … `trace`, or `off`).
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_levels_parse() {
        for l in &["error", "warn", "info", "debug", "trace"] {
            assert!(parse_level(l).is_ok(), "expected '{l}' to be valid");
        }
    }

    #[test]
    fn invalid_level_errors() {
        assert!(parse_level("verbose").is_err());
        assert!(parse_level("").is_err());
    }

    #[test]
    fn bare_level_scopes_to_own_targets() {
        let d = directives_for("debug").unwrap();
        assert!(d.starts_with("warn,"));
        assert!(d.contains("folio_bot=debug"));
        assert!(d.contains("tower_http=debug"));

        let d = directives_for("error").unwrap();
        assert!(d.starts_with("error,"));

        assert_eq!(directives_for("folio_bot=trace,hyper=info").unwrap(), "folio_bot=trace,hyper=info");
        assert!(directives_for("verbose").is_err());
    }

    #[test]
    fn flag_level_beats_rust_log() {
        let f = build_filter("trace", true, Some("folio_bot=warn")).unwrap();
        assert!(f.to_string().contains("folio_bot=trace"));

        // A bad flag level falls back to RUST_LOG, and fails only without one.
        assert!(build_filter("loud", true, Some("info")).is_ok());
        assert!(build_filter("loud", true, None).is_err());
    }

    #[test]
    fn rust_log_beats_configured_level() {
        let f = build_filter("info", false, Some("folio_bot=warn")).unwrap();
        assert!(f.to_string().contains("folio_bot=warn"));

        let f = build_filter("info", false, Some("folio_bot=loud")).unwrap();
        assert!(f.to_string().contains("folio_bot=info"));
    }

    #[test]
    fn unwritable_log_file_is_reported() {
        let result = init("info", true, Some(Path::new("/nonexistent-dir/folio.log")));
        match result {
            Err(AppError::Logger(msg)) => assert!(msg.contains("log file")),
            other => panic!("expected log file error, got {other:?}"),
        }
    }
}
