use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use super::channel::ChannelProvider;
use super::connection::{broker_uri, RabbitMqConnection};
use super::consumer::{Consumer, SessionEnd};
use super::handler::MessageHandler;
use super::manager::{Connector, EstablishError, Session};
use crate::config::{BrokerSettings, Config};
use crate::metrics::Metrics;

/// Connector backed by a real RabbitMQ broker.
pub struct LapinConnector {
    broker: BrokerSettings,
    service_name: String,
    prefetch_count: u16,
    connect_timeout: Duration,
    handler: Arc<dyn MessageHandler>,
    metrics: Arc<Metrics>,
}

impl LapinConnector {
    pub fn new(
        config: &Config,
        handler: Arc<dyn MessageHandler>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            broker: config.broker.clone(),
            service_name: config.service_name.clone(),
            prefetch_count: config.prefetch_count,
            connect_timeout: config.connect_timeout,
            handler,
            metrics,
        }
    }

    async fn open_pipeline(
        &self,
        connection: &RabbitMqConnection,
    ) -> Result<(Consumer, lapin::Consumer), EstablishError> {
        let channel =
            ChannelProvider::create_channel(connection.get_connection(), self.prefetch_count)
                .await?;

        let consumer = Consumer::new(
            channel,
            self.broker.queue.clone(),
            format!("{}-{}", self.service_name, uuid::Uuid::new_v4()),
            self.handler.clone(),
            self.metrics.clone(),
        );

        consumer.declare_queue().await?;
        let deliveries = consumer.subscribe().await?;

        Ok((consumer, deliveries))
    }
}

#[async_trait]
impl Connector for LapinConnector {
    async fn establish(&self) -> Result<Box<dyn Session>, EstablishError> {
        // An unusable URL is a connect failure like any other and goes
        // through the reconnect path.
        let uri = broker_uri(&self.broker)?;
        let connection = RabbitMqConnection::connect(uri, self.connect_timeout).await?;

        let pipeline =
            match tokio::time::timeout(self.connect_timeout, self.open_pipeline(&connection)).await {
                Ok(result) => result,
                Err(_) => Err(EstablishError::Timeout(self.connect_timeout)),
            };

        match pipeline {
            Ok((consumer, deliveries)) => {
                let connection_errors = connection.watch_errors();
                info!(queue = %self.broker.queue, "Connected to RabbitMQ and consuming");

                Ok(Box::new(LapinSession {
                    connection: Some(connection),
                    consumer,
                    deliveries,
                    connection_errors,
                }))
            }
            Err(e) => {
                // A half-built pipeline must not outlive this attempt.
                if let Err(close_err) = connection.shutdown().await {
                    error!(error = %close_err, "Failed to close connection after setup failure");
                }
                Err(e)
            }
        }
    }
}

struct LapinSession {
    connection: Option<RabbitMqConnection>,
    consumer: Consumer,
    deliveries: lapin::Consumer,
    connection_errors: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl Session for LapinSession {
    async fn run(&mut self) -> SessionEnd {
        self.consumer
            .consume(&mut self.deliveries, &mut self.connection_errors)
            .await
    }

    async fn close(&mut self) {
        if let Err(e) = ChannelProvider::close_channel(self.consumer.channel()).await {
            error!(error = %e, "Error closing channel");
        }

        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.shutdown().await {
                error!(error = %e, "Error closing connection");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::DeliveryOutcome;
    use crate::messaging::connection::ConnectionError;
    use crate::messaging::handler::HandlerError;
    use crate::messaging::manager::{ConnectionManager, ManagerError};
    use crate::messaging::reconnect::ReconnectState;

    struct NoopHandler;

    #[async_trait]
    impl MessageHandler for NoopHandler {
        async fn handle(&self, _payload: &[u8]) -> Result<DeliveryOutcome, HandlerError> {
            Ok(DeliveryOutcome::delivered(200))
        }
    }

    fn config(url: &str) -> Config {
        Config {
            broker: BrokerSettings {
                url: url.to_string(),
                vhost: None,
                username: None,
                password: None,
                port: None,
                queue: "registro".to_string(),
            },
            api_url: "http://127.0.0.1/registro".to_string(),
            service_name: "registro-consumer".to_string(),
            prefetch_count: 10,
            connect_timeout: Duration::from_secs(1),
            http_timeout: Duration::from_secs(1),
            metrics_port: 9090,
            rust_log: "info".to_string(),
        }
    }

    fn connector(url: &str) -> (LapinConnector, Arc<Metrics>) {
        let metrics = Metrics::new().unwrap();
        let connector = LapinConnector::new(&config(url), Arc::new(NoopHandler), metrics.clone());
        (connector, metrics)
    }

    #[tokio::test]
    async fn test_invalid_url_is_an_establish_failure() {
        let (connector, _) = connector("http://not-amqp");

        let err = match connector.establish().await {
            Ok(_) => panic!("establish succeeded with an invalid URL"),
            Err(e) => e,
        };

        assert!(matches!(
            err,
            EstablishError::Connection(ConnectionError::InvalidUri(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_url_goes_through_reconnect_path() {
        let (connector, metrics) = connector("http://not-amqp");
        let mut manager = ConnectionManager::with_reconnect_state(
            connector,
            ReconnectState::new(3, 1000),
            metrics.clone(),
        );

        let started = tokio::time::Instant::now();
        let fatal = manager.run().await;

        assert!(matches!(fatal, ManagerError::ReconnectExhausted { attempts: 3 }));
        assert_eq!(started.elapsed(), Duration::from_secs(1 + 2 + 4));
        assert_eq!(metrics.reconnect_attempts_total.get(), 3.0);
    }
}
