//! Log setup
use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::{
    filter::ParseError, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Logging configuration.
#[derive(Deserialize, Debug)]
pub struct Config {
    /// Default filter, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid log filter {0}: {1}")]
    Filter(String, ParseError),

    #[error("TryInitError error: {0}")]
    TryInit(#[from] tracing_subscriber::util::TryInitError),
}

// HTTP client internals only log at error level.
fn filter(level: &str) -> Result<EnvFilter, Error> {
    let directives = format!("{level},hyper=error,reqwest=error");
    EnvFilter::try_new(&directives).map_err(|e| Error::Filter(level.to_string(), e))
}

pub fn init_tracing_subscriber(config: &Config) -> Result<(), Error> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());

    tracing_subscriber::registry()
        .with(filter(&level)?)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[rstest::rstest]
    #[case("info", true)]
    #[case("debug,vinfast_tokio=trace", true)]
    #[case("vinfast_tokio=loud", false)]
    fn test_filter(#[case] level: &str, #[case] valid: bool) {
        assert_eq!(filter(level).is_ok(), valid);
    }

    #[test]
    fn test_default_level() {
        let config: Config = serde_yml::from_str("{}").unwrap();
        assert_eq!(config.level, "info");
    }
}
