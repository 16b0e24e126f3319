//! Logging setup for UnderSight.
//!
//! Events go to stderr so command output on stdout stays machine-readable.
//! `RUST_LOG` wins over the configured level when it is set.

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer,
};

/// Crates whose events pass the default filter.
const WORKSPACE_CRATES: &[&str] = &["us_core", "us_connectors", "us_observability", "us_cli"];

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    /// One JSON object per event instead of human-readable lines.
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set. Dependencies such
    /// as reqwest stay at their own defaults.
    pub fn filter_directive(&self) -> String {
        WORKSPACE_CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Installs the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let fmt_layer = if config.json_format {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
}

/// Span for one record of a received batch.
#[macro_export]
macro_rules! inventory_span {
    ($tenant_id:expr, $index:expr) => {
        tracing::info_span!("inventory_item", tenant_id = %$tenant_id, index = $index)
    };
    ($tenant_id:expr, $index:expr, $($field:tt)*) => {
        tracing::info_span!("inventory_item", tenant_id = %$tenant_id, index = $index, $($field)*)
    };
}

/// Span for a manual approve or reject of one item.
#[macro_export]
macro_rules! decision_span {
    ($tenant_id:expr, $item_id:expr, $status:expr) => {
        tracing::info_span!(
            "inventory_decision",
            tenant_id = %$tenant_id,
            item_id = %$item_id,
            status = %$status
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.json_format);
    }

    #[test]
    fn test_filter_directive_covers_workspace() {
        let config = LoggingConfig {
            level: Level::DEBUG,
            json_format: true,
        };
        assert_eq!(
            config.filter_directive(),
            "us_core=DEBUG,us_connectors=DEBUG,us_observability=DEBUG,us_cli=DEBUG"
        );
    }

    #[test]
    fn test_second_init_is_rejected() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_spans_accept_fields() {
        let item = uuid::Uuid::new_v4();
        let _batch = inventory_span!("t1", 3, hostname = "srv1");
        let _decision = decision_span!("t1", item, "approved");
    }
}
