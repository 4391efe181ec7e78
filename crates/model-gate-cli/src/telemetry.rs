//! Logging setup for the binaries
//!
//! Logs go to stderr so stdout stays free for the `key=value` lines the
//! pipeline reads.

use tracing::Subscriber;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
    util::TryInitError, EnvFilter, Layer,
};

use crate::config::LoggingConfig;

/// `RUST_LOG` when set, otherwise the configured level
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn fmt_layer<S>(logging: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(logging.include_target)
        .with_thread_ids(logging.include_thread_ids);

    match (logging.json_format, logging.include_timestamps) {
        (true, true) => layer
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        (true, false) => layer
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .without_time()
            .boxed(),
        (false, true) => layer.boxed(),
        (false, false) => layer.without_time().boxed(),
    }
}

/// Install the global subscriber
///
/// Fails if a subscriber is already installed.
pub fn init(logging: &LoggingConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(fmt_layer(logging))
        .with(env_filter(&logging.level))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_instead_of_panicking() {
        let logging = LoggingConfig {
            level: "warn".to_string(),
            json_format: true,
            include_timestamps: false,
            ..LoggingConfig::default()
        };
        let _ = init(&logging);
        assert!(init(&logging).is_err());
    }
}
