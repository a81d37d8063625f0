//! Stateful receiver code.

use crate::pipes::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::error;

/// Old and new value.
pub type OldNewType<T> = (Option<T>, T);

type SubscribeMessage<T> = (broadcast::Receiver<OldNewType<T>>, Option<T>);

pub(super) enum ReceiveMessage<T> {
    Get(oneshot::Sender<Option<T>>),
    Subscribe(oneshot::Sender<SubscribeMessage<T>>),
}

/// Receive a value from an entity.
#[derive(Debug, Clone)]
pub struct Receiver<T> {
    pub(super) name: String,
    pub(super) tx: mpsc::Sender<ReceiveMessage<T>>,
}

impl<T> Receiver<T>
where
    T: Send + Clone,
{
    /// Retrieve the most recent value from the entity.
    ///
    /// Returns `None` if the entity is closed or has no value yet.
    pub async fn get(&self) -> Option<T> {
        let (tx, rx) = oneshot::channel();
        let msg = ReceiveMessage::Get(tx);
        if let Err(err) = self.tx.send(msg).await {
            error!("{}: get/send failed: {}", self.name, err);
            return None;
        }
        rx.await.unwrap_or_else(|_| {
            error!("{}: get/await failed", self.name);
            None
        })
    }

    /// Subscribe to this entity.
    ///
    /// The current value, if any, is delivered first. Returns an already
    /// closed subscription if the entity is closed.
    pub async fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = oneshot::channel();
        let msg = ReceiveMessage::Subscribe(tx);
        if let Err(err) = self.tx.send(msg).await {
            error!("{}: subscribe/send failed: {}", self.name, err);
            return Subscription::null(self.tx.clone());
        }
        rx.await.map_or_else(
            |_| {
                error!("{}: subscribe/await failed", self.name);
                Subscription::null(self.tx.clone())
            },
            |(rx, initial)| Subscription {
                rx,
                _tx: self.tx.clone(),
                initial,
            },
        )
    }
}

/// A subscription to receive data from an entity.
pub struct Subscription<T> {
    rx: broadcast::Receiver<OldNewType<T>>,
    // Keeps the pipe alive while subscribed.
    _tx: mpsc::Sender<ReceiveMessage<T>>,
    initial: Option<T>,
}

impl<T> Subscription<T>
where
    T: Clone,
{
    /// Create a null subscription that is already closed.
    fn null(tx: mpsc::Sender<ReceiveMessage<T>>) -> Self {
        let (_tx, rx) = broadcast::channel(1);
        Self {
            rx,
            _tx: tx,
            initial: None,
        }
    }
}

impl<T> Subscription<T>
where
    T: Send + Clone,
{
    /// Wait for the next value from the entity.
    ///
    /// This will return (old value, new value)
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Closed` if the entity is closed.
    pub async fn recv_old_new(&mut self) -> Result<OldNewType<T>, RecvError> {
        if let Some(initial) = self.initial.take() {
            return Ok((None, initial));
        }
        loop {
            match self.rx.recv().await {
                Ok(v) => return Ok(v),
                Err(broadcast::error::RecvError::Closed) => return Err(RecvError::Closed),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    error!("recv: the pipe lagged, skipped {skipped} values");
                }
            }
        }
    }

    /// Wait for the next value from the entity.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Closed` if the entity is closed.
    pub async fn recv(&mut self) -> Result<T, RecvError> {
        self.recv_old_new().await.map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::super::create_pipe;
    use super::*;

    #[tokio::test]
    async fn test_null_subscription() {
        let (tx, _rx) = mpsc::channel::<ReceiveMessage<u8>>(1);
        let mut sub = Subscription::null(tx);
        assert_eq!(sub.recv().await, Err(RecvError::Closed));
    }

    #[tokio::test]
    async fn test_only_changes_are_sent() {
        let (tx, rx) = create_pipe::<u8>("test");
        tx.try_send(1);
        assert_eq!(rx.get().await, Some(1));

        let mut sub = rx.subscribe().await;
        assert_eq!(sub.recv_old_new().await.unwrap(), (None, 1));

        tx.try_send(1);
        tx.try_send(2);
        assert_eq!(sub.recv_old_new().await.unwrap(), (Some(1), 2));
        assert_eq!(rx.get().await, Some(2));
    }

    #[tokio::test]
    async fn test_closed_when_sender_dropped() {
        let (tx, rx) = create_pipe::<u8>("test");
        let mut sub = rx.subscribe().await;
        drop(tx);
        assert_eq!(sub.recv().await, Err(RecvError::Closed));
    }
}
