//! Tracing setup

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level. Returns false if a subscriber
/// was already installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
        .try_init()
        .is_ok()
}
