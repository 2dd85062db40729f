use gatehouse::config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Initializes the application and invokes gatehouse.
///
/// This initializes the logging, aggregates configuration and starts the multithreaded tokio
/// runtime. This is only a thin wrapper around the gatehouse crate that supplies the necessary
/// settings. Exits non-zero on configuration or bind failures, zero on a clean shutdown.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().compact())
        .init();

    // parse the layered configuration
    let config = Config::read()?;

    // run gatehouse blocking
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(gatehouse::run(config))
}
