use async_trait::async_trait;

use crate::contracts::DeliveryOutcome;

/// Processes one message body. `Ok` settles the message with an ack,
/// `Err` sends it back to the queue.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Result<DeliveryOutcome, HandlerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Message rejected (will requeue): {0}")]
    Rejected(String),
}
