//! Deliver entity values to whatever consumes them.
use std::sync::Arc;

use async_trait::async_trait;
use tokio::{select, task::JoinHandle};
use tracing::{debug, info, warn};
use vinfast_common::{
    datetime::datetime_to_string,
    entities::{self, Description, Id, Value},
};

use crate::{services::vinfast::poller::{Outputs, PollStatus}, spawn};

/// Receives entity updates for vehicles.
#[async_trait]
pub trait EntitySink: Send + Sync {
    /// An entity changed value.
    async fn publish(&self, vehicle: &Id, entity: &'static Description, value: &Value);

    /// The poller status changed.
    async fn publish_status(&self, vehicle: &Id, status: &PollStatus);
}

/// Write entity changes to the log.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl EntitySink for LogSink {
    async fn publish(&self, vehicle: &Id, entity: &'static Description, value: &Value) {
        let unit = match value {
            Value::Number(_) => entity.unit.unwrap_or(""),
            _ => "",
        };
        info!(
            entity = %entity.entity_id(vehicle),
            "{}: {value}{unit}",
            entity.name
        );
    }

    async fn publish_status(&self, vehicle: &Id, status: &PollStatus) {
        let next = status
            .next_poll_at
            .as_ref()
            .map_or_else(|| "never".to_string(), datetime_to_string);

        if let Some(reason) = &status.paused {
            warn!(%vehicle, "paused: {reason}");
        } else if let Some(error) = &status.last_error {
            warn!(%vehicle, "last poll failed: {error}, next poll {next}");
        } else {
            info!(%vehicle, "mode {:?}, next poll {next}", status.mode);
        }
    }
}

/// Forward a poller's outputs to a sink until the poller stops.
///
/// Only entities whose value changed are published.
pub fn publish_entities(id: Id, outputs: &Outputs, sink: Arc<dyn EntitySink>) -> JoinHandle<()> {
    let snapshot = outputs.snapshot.clone();
    let status = outputs.status.clone();

    spawn(async move {
        let mut snapshots = snapshot.subscribe().await;
        let mut statuses = status.subscribe().await;

        loop {
            select! {
                Ok((old, new)) = snapshots.recv_old_new() => {
                    let old = old.as_ref().map(|old| &old.telemetry);
                    for (entity, value) in entities::changed(old, &new.telemetry) {
                        sink.publish(&id, entity, &value).await;
                    }
                }
                Ok(status) = statuses.recv() => {
                    sink.publish_status(&id, &status).await;
                }
                else => break,
            }
        }

        debug!("{id}: entity publisher finished");
    })
}
