//! Telemetry logic.
//! Structured logging with env-controlled filtering.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn,tower_http=debug";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default directives.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
        )
        .with(fmt::layer())
        .init();
}
