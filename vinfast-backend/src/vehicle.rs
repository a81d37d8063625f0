use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{error, info};
use vinfast_common::entities::Id;
use vinfast_tokio::{
    services::{
        persistent_state::PersistentStateDatabase,
        vinfast::{
            api::{Client, Endpoints},
            poller::{run, Poller, PollerHandle},
        },
    },
    sinks::{publish_entities, EntitySink},
};

use crate::config::VehicleConfig;

/// A running poller and the task publishing its entities.
pub struct Vehicle {
    id: Id,
    handle: PollerHandle,
    publisher: JoinHandle<()>,
}

/// Start polling a configured vehicle.
pub fn start(
    config: VehicleConfig,
    database: &PersistentStateDatabase,
    sink: Arc<dyn EntitySink>,
) -> Result<Vehicle> {
    let schedule = config.schedule()?;
    let client = Client::new(Endpoints::for_region(config.region)?)?;
    let token_store = database.for_name(&config.id, "token");

    info!(
        "{}: polling {} account {}",
        config.id,
        config.region.config().name,
        config.credentials.email
    );

    let poller = Poller::new(
        config.id.clone(),
        client,
        config.credentials,
        config.vin,
        schedule,
    )
    .with_token_store(token_store);

    let (handle, outputs) = run(poller, None);
    let publisher = publish_entities(config.id.clone(), &outputs, sink);

    Ok(Vehicle {
        id: config.id,
        handle,
        publisher,
    })
}

impl Vehicle {
    pub fn refresh(&self) {
        info!("{}: refresh requested", self.id);
        self.handle.refresh();
    }

    pub async fn stop(self) {
        self.handle.stop().await;
        if let Err(err) = self.publisher.await {
            error!("{}: publisher failed: {err}", self.id);
        }
    }
}
