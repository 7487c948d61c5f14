//! Tracing subscriber setup. `RUST_LOG` wins over the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::GameConfig;

/// Used when neither `RUST_LOG` nor the config names a filter.
pub const DEFAULT_FILTER: &str = "info,tungstenite=warn,tokio_tungstenite=warn";

/// Filter directives from the config, or the built-in default when it has none.
pub fn filter_directives(config: &GameConfig) -> &str {
    if config.log_level.trim().is_empty() {
        DEFAULT_FILTER
    } else {
        &config.log_level
    }
}

pub fn init_logging(config: &GameConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry().with(env_filter).with(console_layer).try_init();
}
