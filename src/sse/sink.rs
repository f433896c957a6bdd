//! Per-client delivery channel

use thiserror::Error;
use tokio::sync::mpsc;

/// Delivery failure; the client is treated as disconnected
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("client channel closed")]
    Closed,
    #[error("send failed: {0}")]
    Failed(String),
}

/// One-way, non-blocking message delivery to a single client.
///
/// Implementations are invoked while the registry lock is held and must not
/// call back into the manager.
pub trait ClientSink: Send + Sync {
    fn send(&self, message: &str) -> Result<(), SinkError>;
}

impl<F> ClientSink for F
where
    F: Fn(&str) -> Result<(), SinkError> + Send + Sync,
{
    fn send(&self, message: &str) -> Result<(), SinkError> {
        self(message)
    }
}

/// Sink backed by an unbounded tokio channel, drained by the HTTP stream
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ClientSink for ChannelSink {
    fn send(&self, message: &str) -> Result<(), SinkError> {
        self.tx
            .send(message.to_string())
            .map_err(|_| SinkError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.send("one").unwrap();
        sink.send("two").unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("one"));
        assert_eq!(rx.recv().await.as_deref(), Some("two"));
    }

    #[test]
    fn test_channel_sink_fails_when_receiver_dropped() {
        let (sink, rx) = ChannelSink::channel();
        drop(rx);
        assert!(matches!(sink.send("x"), Err(SinkError::Closed)));
    }

    #[test]
    fn test_closure_sink() {
        let sink = |msg: &str| -> Result<(), SinkError> {
            if msg.is_empty() {
                Err(SinkError::Failed("empty".into()))
            } else {
                Ok(())
            }
        };
        assert!(ClientSink::send(&sink, "x").is_ok());
        assert!(ClientSink::send(&sink, "").is_err());
    }
}
