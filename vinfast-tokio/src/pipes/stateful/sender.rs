//! Stateful sender code.
use tokio::sync::mpsc;
use tracing::error;

pub(super) enum SendMessage<T> {
    Set(T),
}

/// Send a value to an entity.
#[derive(Clone)]
pub struct Sender<T> {
    pub(super) name: String,
    pub(super) tx: mpsc::Sender<SendMessage<T>>,
}

impl<T> Sender<T> {
    /// Send data to the entity or log an error if the buffer is full.
    pub fn try_send(&self, data: T) {
        let msg = SendMessage::Set(data);
        if let Err(err) = self.tx.try_send(msg) {
            error!("{}: send failed: {}", self.name, err);
        }
    }
}
