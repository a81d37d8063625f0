//! Main entry point for the application.

#![warn(missing_docs)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod config;
mod logging;
mod vehicle;
mod yaml;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    select,
    signal::unix::{signal, SignalKind},
};
use tracing::info;
use vinfast_tokio::{
    services::persistent_state::PersistentStateDatabase,
    sinks::{EntitySink, LogSink},
};

use self::vehicle::Vehicle;

#[tokio::main]
async fn main() -> Result<()> {
    color_backtrace::install();

    let env = config::Environment::load().context("Error loading environment")?;
    let config = env.config().context("Error loading config")?;

    logging::init_tracing_subscriber(&config.logging)
        .context("Error initializing tracing subscriber")?;

    info!("Starting vinfast-backend");

    let database = PersistentStateDatabase::new(&config.persistent_state)
        .context("Error getting persistent state loader")?;

    let sink: Arc<dyn EntitySink> = Arc::new(LogSink);

    let vehicles = config
        .vehicles
        .into_iter()
        .map(|vehicle| vehicle::start(vehicle, &database, sink.clone()))
        .collect::<Result<Vec<_>>>()?;

    wait_for_signals(&vehicles).await?;

    info!("Shutting down");
    for vehicle in vehicles {
        vehicle.stop().await;
    }

    Ok(())
}

/// `SIGHUP` refreshes every vehicle, `SIGINT` or `SIGTERM` returns.
async fn wait_for_signals(vehicles: &[Vehicle]) -> Result<()> {
    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    loop {
        select! {
            _ = hangup.recv() => {
                vehicles.iter().for_each(Vehicle::refresh);
            }
            _ = terminate.recv() => break,
            _ = interrupt.recv() => break,
        }
    }

    Ok(())
}
