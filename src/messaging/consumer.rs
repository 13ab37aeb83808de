use futures::{Stream, StreamExt};
use lapin::{message::Delivery, options::*, types::FieldTable, Channel};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::ack::{ChannelAcker, InboundMessage};
use super::dispatch::dispatch;
use super::handler::MessageHandler;
use crate::metrics::Metrics;

/// Why a consuming session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The delivery stream finished: the channel or connection was closed.
    Closed,

    /// The connection reported an error.
    Faulted(String),
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "connection closed unexpectedly"),
            Self::Faulted(reason) => write!(f, "connection error: {}", reason),
        }
    }
}

pub struct Consumer {
    channel: Channel,
    queue_name: String,
    consumer_tag: String,
    handler: Arc<dyn MessageHandler>,
    metrics: Arc<Metrics>,
}

impl Consumer {
    pub fn new(
        channel: Channel,
        queue_name: String,
        consumer_tag: String,
        handler: Arc<dyn MessageHandler>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            channel,
            queue_name,
            consumer_tag,
            handler,
            metrics,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Declares the queue durable. A queue that already exists with other
    /// flags makes the broker close the channel, which surfaces here as an
    /// error.
    pub async fn declare_queue(&self) -> Result<(), ConsumerError> {
        let queue = self
            .channel
            .queue_declare(
                &self.queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                error!(error = %e, queue = %self.queue_name, "Queue declaration failed");
                ConsumerError::DeclareFailed(e.to_string())
            })?;

        info!(
            queue = %self.queue_name,
            messages = queue.message_count(),
            consumers = queue.consumer_count(),
            "Durable queue declared"
        );

        Ok(())
    }

    pub async fn subscribe(&self) -> Result<lapin::Consumer, ConsumerError> {
        let deliveries = self
            .channel
            .basic_consume(
                &self.queue_name,
                &self.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                error!(error = %e, queue = %self.queue_name, "Failed to start consumer");
                ConsumerError::ConsumeFailed(e.to_string())
            })?;

        info!(
            queue = %self.queue_name,
            consumer_tag = %self.consumer_tag,
            "Listening for messages"
        );

        Ok(deliveries)
    }

    /// Pumps deliveries until the stream ends or the connection reports an
    /// error. Each delivery is processed on its own task, so acks may land
    /// out of delivery order.
    pub async fn consume(
        &self,
        deliveries: &mut lapin::Consumer,
        connection_errors: &mut mpsc::UnboundedReceiver<String>,
    ) -> SessionEnd {
        let end = pump_deliveries(deliveries, connection_errors, |delivery| {
            self.spawn_dispatch(delivery)
        })
        .await;

        warn!(consumer_tag = %self.consumer_tag, reason = %end, "Consumer stopped");
        end
    }

    fn spawn_dispatch(&self, delivery: Delivery) {
        let Delivery {
            delivery_tag,
            redelivered,
            data,
            ..
        } = delivery;

        debug!(delivery_tag, "Delivery received");

        let message = InboundMessage::new(
            delivery_tag,
            redelivered,
            data,
            ChannelAcker::new(self.channel.clone()),
        );
        let handler = self.handler.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            dispatch(handler.as_ref(), message, &metrics).await;
        });
    }
}

/// Hands each delivery to `on_delivery` until the connection reports an
/// error or the delivery stream fails or ends. A dropped error sender does
/// not end the loop.
async fn pump_deliveries<S, T, E>(
    deliveries: &mut S,
    connection_errors: &mut mpsc::UnboundedReceiver<String>,
    mut on_delivery: impl FnMut(T),
) -> SessionEnd
where
    S: Stream<Item = Result<T, E>> + Unpin,
    E: fmt::Display,
{
    loop {
        tokio::select! {
            Some(reason) = connection_errors.recv() => {
                error!(error = %reason, "Connection error");
                return SessionEnd::Faulted(reason);
            }

            delivery = deliveries.next() => {
                match delivery {
                    Some(Ok(delivery)) => on_delivery(delivery),
                    Some(Err(e)) => {
                        error!(error = %e, "Error receiving message from RabbitMQ");
                        return SessionEnd::Faulted(e.to_string());
                    }
                    None => {
                        warn!("Consumer stream ended");
                        return SessionEnd::Closed;
                    }
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Failed to start consumer: {0}")]
    ConsumeFailed(String),

    #[error("Failed to declare queue: {0}")]
    DeclareFailed(String),
}
