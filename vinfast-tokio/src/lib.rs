//! Poll the VinFast connected car service and publish vehicle state.
#![warn(missing_docs)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::use_self)]

pub mod pipes;
pub mod services;
pub mod sinks;

use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Spawn a task and automatically monitor its execution.
///
/// A panic inside the task is fatal for the process; cancellation is not.
pub fn spawn<T>(future: T) -> JoinHandle<()>
where
    T: Future + Send + 'static,
    T::Output: Send + 'static,
{
    let task = tokio::spawn(future);

    tokio::spawn(async move {
        match task.await {
            Ok(_rc) => {
                debug!("The thread terminated normally");
            }
            Err(err) if err.is_cancelled() => {
                debug!("The thread was cancelled");
            }
            Err(err) => {
                error!("The thread aborted with error: {err}");
                std::process::exit(1);
            }
        }
    })
}
