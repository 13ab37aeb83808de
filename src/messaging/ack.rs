use async_trait::async_trait;
use lapin::{options::*, Channel};

/// Settles a single delivery on the broker.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn ack(&self, delivery_tag: u64) -> Result<(), AckError>;

    async fn nack_requeue(&self, delivery_tag: u64) -> Result<(), AckError>;
}

/// Acknowledges through the channel the delivery arrived on.
#[derive(Clone)]
pub struct ChannelAcker {
    channel: Channel,
}

impl ChannelAcker {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl Acknowledger for ChannelAcker {
    async fn ack(&self, delivery_tag: u64) -> Result<(), AckError> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| AckError::Broker(e.to_string()))
    }

    async fn nack_requeue(&self, delivery_tag: u64) -> Result<(), AckError> {
        self.channel
            .basic_nack(
                delivery_tag,
                BasicNackOptions {
                    multiple: false,
                    requeue: true,
                },
            )
            .await
            .map_err(|e| AckError::Broker(e.to_string()))
    }
}

/// A delivery awaiting its verdict.
///
/// Both settling methods take `self`, so a message can be settled once and
/// only once.
pub struct InboundMessage<A: Acknowledger> {
    delivery_tag: u64,
    redelivered: bool,
    payload: Vec<u8>,
    acker: A,
}

impl<A: Acknowledger> InboundMessage<A> {
    pub fn new(delivery_tag: u64, redelivered: bool, payload: Vec<u8>, acker: A) -> Self {
        Self {
            delivery_tag,
            redelivered,
            payload,
            acker,
        }
    }

    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    pub fn redelivered(&self) -> bool {
        self.redelivered
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub async fn acknowledge(self) -> Result<(), AckError> {
        self.acker.ack(self.delivery_tag).await
    }

    pub async fn reject_and_requeue(self) -> Result<(), AckError> {
        self.acker.nack_requeue(self.delivery_tag).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AckError {
    #[error("Broker refused acknowledgment: {0}")]
    Broker(String),
}
