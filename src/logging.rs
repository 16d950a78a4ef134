//! `tracing` subscriber setup for binaries and tests embedding the crate.
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directive when neither `RUST_LOG` nor an explicit filter is given.
pub const DEFAULT_FILTER: &str = "info";

/// Install a formatted subscriber filtered by `filter`, or by `RUST_LOG` when `None`.
///
/// Only the first call installs a subscriber; later calls (or a subscriber
/// installed elsewhere) are left untouched.
///
/// Return
/// ----------
/// * `true` if this call installed the subscriber.
pub fn init(filter: Option<&str>) -> bool {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .is_ok()
}
