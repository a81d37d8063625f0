//! Pipes carry the latest value of an entity to any number of subscribers.

use thiserror::Error;

pub mod stateful;

/// Size of all pipes.
pub const PIPE_SIZE: usize = 10;

/// Something went wrong in Receiver.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum RecvError {
    /// The Pipe was closed.
    #[error("The pipe was closed")]
    Closed,
}
