use crate::config::{LogFormat, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "invalid log level/filter '{value}'")
            }
            TelemetryError::Subscriber(err) => write!(f, "unable to install subscriber: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Resolve the active filter: `RUST_LOG` wins over the configured level.
pub fn filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => {
            EnvFilter::try_new(&config.log_level).map_err(|source| TelemetryError::EnvFilter {
                value: config.log_level.clone(),
                source,
            })
        }
    }
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    installed.map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::env_guard;

    fn garbage_level() -> TelemetryConfig {
        TelemetryConfig {
            log_level: "campus_hub=verbose".to_string(),
            format: LogFormat::Compact,
        }
    }

    #[test]
    fn rejects_garbage_filters() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        let saved = std::env::var("RUST_LOG").ok();
        std::env::remove_var("RUST_LOG");

        let outcome = filter(&garbage_level());

        if let Some(value) = saved {
            std::env::set_var("RUST_LOG", value);
        }
        match outcome {
            Err(TelemetryError::EnvFilter { value, .. }) => assert_eq!(value, "campus_hub=verbose"),
            other => panic!("expected filter error, got {other:?}"),
        }
    }

    #[test]
    fn rust_log_overrides_configured_level() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        let saved = std::env::var("RUST_LOG").ok();
        std::env::set_var("RUST_LOG", "campus_hub=debug");

        let outcome = filter(&garbage_level());

        match saved {
            Some(value) => std::env::set_var("RUST_LOG", value),
            None => std::env::remove_var("RUST_LOG"),
        }
        assert!(outcome.is_ok(), "{outcome:?}");
    }
}
