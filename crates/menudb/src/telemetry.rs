use crate::error::Error;
use menudb_core::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Install the global `tracing` subscriber described by `config`.
///
/// Logs go to stderr. Fails if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Error> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|err| Error::config(format!("invalid log filter '{}': {err}", config.filter)))?;

    tracing_subscriber::registry()
        .with(stderr_layer(config.format))
        .with(filter)
        .try_init()
        .map_err(|err| Error::config(format!("tracing already initialised: {err}")))
}

fn stderr_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Pretty => Box::new(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(true),
        ),
        LogFormat::Compact => Box::new(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(true),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true),
        ),
    }
}

///
/// TESTS
///
