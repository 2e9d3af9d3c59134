use crate::error::PublisherError;
use events::BusMessage;
use tokio::sync::broadcast;

/// A destination for bus messages.
///
/// Sinks must not block: the publisher calls them from its timer loop.
pub trait FeatureSink: Send + Sync {
    fn publish(&self, message: BusMessage) -> Result<(), PublisherError>;
}

/// Fans messages out to in-process subscribers over a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<BusMessage>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.sender.subscribe()
    }
}

impl From<broadcast::Sender<BusMessage>> for BroadcastSink {
    fn from(sender: broadcast::Sender<BusMessage>) -> Self {
        Self { sender }
    }
}

impl FeatureSink for BroadcastSink {
    /// Fails with `SinkClosed` once every receiver has been dropped.
    fn publish(&self, message: BusMessage) -> Result<(), PublisherError> {
        self.sender
            .send(message)
            .map(|_| ())
            .map_err(|_| PublisherError::SinkClosed("no active bus subscribers".to_string()))
    }
}

/// Writes every message as a JSON line through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl FeatureSink for LogSink {
    fn publish(&self, message: BusMessage) -> Result<(), PublisherError> {
        let json = message.to_json()?;
        tracing::info!(target: "feature_bus", message = %json);
        Ok(())
    }
}
