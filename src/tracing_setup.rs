use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::models::LoggingConfig;

/// Initialize logging from the `[logging]` section.
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .wrap_err_with(|| format!("Invalid log level: {}", logging.level))?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    if logging.json {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.json().with_current_span(true).with_span_list(true))
            .try_init()
            .wrap_err("Failed to install JSON subscriber")?;
    } else {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.compact())
            .try_init()
            .wrap_err("Failed to install console subscriber")?;
    }

    tracing::debug!(level = %logging.level, json = logging.json, "Logging initialized");
    Ok(())
}

/// Span wrapping one reconciliation pass
pub fn reconcile_span(operation: &str) -> tracing::Span {
    tracing::info_span!(
        "reconcile",
        operation = operation,
        transaction_id = tracing::field::Empty,
        attempt = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_rejects_second_install() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            json: true,
        };
        // Only one global subscriber may be installed per process
        let _ = init_tracing(&logging);
        assert!(init_tracing(&logging).is_err());
    }

    #[test]
    fn test_reconcile_span_records_fields() {
        let span = reconcile_span("link add");
        span.record("transaction_id", "tx-1");
        span.record("attempt", 2);
        let _entered = span.enter();
        tracing::info!("inside reconcile span");
    }
}
