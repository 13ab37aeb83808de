use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::contracts::{DeliveryOutcome, PayloadError, RegistroPersonas};
use crate::messaging::handler::{HandlerError, MessageHandler};
use crate::metrics::Metrics;

/// Posts registro records to the ingestion API.
pub struct Forwarder {
    client: reqwest::Client,
    endpoint: String,
    metrics: Arc<Metrics>,
}

impl Forwarder {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForwardError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            metrics,
        })
    }

    /// Maps the payload and posts it.
    ///
    /// Only an unparseable payload is an `Err`. Transport errors, timeouts
    /// and non-2xx answers are logged and reported as
    /// [`DeliveryOutcome::Absorbed`].
    pub async fn forward(&self, payload: &[u8]) -> Result<DeliveryOutcome, ForwardError> {
        let record = RegistroPersonas::from_payload(payload)?;

        debug!(record = ?record, endpoint = %self.endpoint, "Sending record to registro API");

        let start = Instant::now();
        let outcome = self.post(&record).await;
        self.metrics
            .forward_duration_seconds
            .observe(start.elapsed().as_secs_f64());
        self.metrics
            .forward_outcomes_total
            .with_label_values(&[outcome.kind()])
            .inc();

        Ok(outcome)
    }

    async fn post(&self, record: &RegistroPersonas) -> DeliveryOutcome {
        let response = match self.client.post(&self.endpoint).json(record).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, endpoint = %self.endpoint, "Error communicating with the registro API");
                return DeliveryOutcome::absorbed(e.to_string());
            }
        };

        let status = response.status();
        if status.is_success() {
            info!(status = status.as_u16(), id_kit = ?record.id_kit(), "Record delivered to registro API");
            DeliveryOutcome::delivered(status.as_u16())
        } else {
            let reason = format!(
                "{} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            );
            error!(
                status = status.as_u16(),
                reason = %reason,
                endpoint = %self.endpoint,
                "Registro API rejected the record"
            );
            DeliveryOutcome::absorbed(reason)
        }
    }
}

#[async_trait]
impl MessageHandler for Forwarder {
    async fn handle(&self, payload: &[u8]) -> Result<DeliveryOutcome, HandlerError> {
        self.forward(payload)
            .await
            .map_err(|e| HandlerError::Rejected(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("Invalid message payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}
