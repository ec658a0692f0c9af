use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// JSON subscriber filtered by `RUST_LOG`, falling back to `default_filter`.
pub fn get_subscriber(default_filter: &str) -> impl Subscriber + Send + Sync {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .json();

    Registry::default().with(env_filter).with(formatting_layer)
}

/// Install structured JSON logging as the global default. Call once at startup.
///
/// # Panics
/// If a global subscriber is already set
pub fn init_telemetry() {
    get_subscriber("info").init();
}

/// Like `init_telemetry`, but returns `false` instead of panicking when a
/// subscriber is already installed.
pub fn try_init_telemetry(default_filter: &str) -> bool {
    get_subscriber(default_filter).try_init().is_ok()
}
