//! Tracing setup and structured startup events.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins over `level` when set. Calling this twice is harmless,
/// the second call is ignored.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{level},tower_http=info").into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

pub fn log_startup(component: &str, stage: &str, detail: Option<&str>) {
    match detail {
        Some(detail) => info!(component, stage, detail, "startup"),
        None => info!(component, stage, "startup"),
    }
}
