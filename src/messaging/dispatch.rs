use tracing::{error, info, warn};

use super::ack::{Acknowledger, InboundMessage};
use super::handler::MessageHandler;
use crate::metrics::Metrics;

/// How a message was settled on the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Acked,
    Requeued,
}

/// Runs the handler on one message and settles it: ack when the handler
/// returns `Ok` (including absorbed HTTP failures), nack with requeue when
/// it returns `Err`.
///
/// A failed ack/nack call is logged only. The broker requeues whatever is
/// left unsettled when the channel goes away.
pub async fn dispatch<A: Acknowledger>(
    handler: &dyn MessageHandler,
    message: InboundMessage<A>,
    metrics: &Metrics,
) -> Disposition {
    let delivery_tag = message.delivery_tag();
    let redelivered = message.redelivered();

    info!(
        delivery_tag,
        redelivered,
        payload_size = message.payload().len(),
        "Processing message"
    );

    let result = handler.handle(message.payload()).await;

    match result {
        Ok(outcome) => {
            info!(delivery_tag, outcome = %outcome, "Message settled, acknowledging");
            metrics.messages_acked_total.inc();

            if let Err(e) = message.acknowledge().await {
                error!(error = %e, delivery_tag, "Failed to ack message");
            }
            Disposition::Acked
        }
        Err(err) => {
            if redelivered {
                warn!(
                    delivery_tag,
                    error = %err,
                    "Redelivered message failed again; it will keep cycling until fixed or purged"
                );
            } else {
                error!(delivery_tag, error = %err, "Error processing message, requeueing");
            }
            metrics.messages_requeued_total.inc();

            if let Err(e) = message.reject_and_requeue().await {
                error!(error = %e, delivery_tag, "Failed to nack message");
            }
            Disposition::Requeued
        }
    }
}
