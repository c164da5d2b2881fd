use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::NotificationEvent;

/// Delivery to the host failed. The notifier logs it and moves on.
#[derive(Debug, Error)]
#[error("event sink: {0}")]
pub struct SinkError(pub String);

/// Receiver of host events. Implementations should return quickly; the
/// notifier bounds every call with a timeout anyway.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: NotificationEvent) -> Result<(), SinkError>;
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    async fn emit(&self, _event: NotificationEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Forwards events into a tokio channel owned by the host.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<NotificationEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<NotificationEvent>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end, with room for `capacity` queued events.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: NotificationEvent) -> Result<(), SinkError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| SinkError("receiver dropped".to_string()))
    }
}
