use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::channel::ChannelError;
use super::connection::ConnectionError;
use super::consumer::{ConsumerError, SessionEnd};
use super::reconnect::{ReconnectState, ReconnectStep};
use crate::metrics::Metrics;

/// Opens a complete consuming pipeline: connection, channel, durable queue
/// and subscription. Only a pipeline that made it all the way is returned.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn establish(&self) -> Result<Box<dyn Session>, EstablishError>;
}

/// A live pipeline owned by the manager.
#[async_trait]
pub trait Session: Send {
    /// Consumes until the connection closes or faults.
    async fn run(&mut self) -> SessionEnd;

    /// Releases the channel and connection. Errors are logged only.
    async fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ReconnectPending,
    Fatal,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::ReconnectPending => "reconnect_pending",
            Self::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Supervises the broker pipeline and rebuilds it with exponential backoff.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    reconnect: ReconnectState,
    state: ConnectionState,
    metrics: Arc<Metrics>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, metrics: Arc<Metrics>) -> Self {
        Self::with_reconnect_state(connector, ReconnectState::default(), metrics)
    }

    pub fn with_reconnect_state(
        connector: C,
        reconnect: ReconnectState,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            connector,
            reconnect,
            state: ConnectionState::Disconnected,
            metrics,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect.attempts()
    }

    /// Connects and consumes forever. Returns only once the reconnect
    /// ceiling is hit; the caller decides how to terminate.
    pub async fn run(&mut self) -> ManagerError {
        loop {
            self.connect_and_consume().await;

            if let Err(fatal) = self.reconnect_with_delay().await {
                return fatal;
            }
        }
    }

    async fn connect_and_consume(&mut self) {
        self.transition(ConnectionState::Connecting);
        info!(attempt = self.reconnect.attempts(), "Attempting to connect to RabbitMQ");

        let mut session = match self.connector.establish().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Failed to establish broker session");
                return;
            }
        };

        self.reconnect.reset();
        self.transition(ConnectionState::Connected);
        self.metrics.broker_connected.set(1);

        let end = session.run().await;

        self.metrics.broker_connected.set(0);
        warn!(reason = %end, "Broker session ended, reconnecting");
        session.close().await;
    }

    async fn reconnect_with_delay(&mut self) -> Result<(), ManagerError> {
        self.transition(ConnectionState::ReconnectPending);

        match self.reconnect.next_step() {
            ReconnectStep::Exhausted { attempts } => {
                self.transition(ConnectionState::Fatal);
                error!(attempts, "Maximum reconnect attempts reached, giving up");
                Err(ManagerError::ReconnectExhausted { attempts })
            }
            ReconnectStep::Retry { attempt, delay } => {
                info!(
                    attempt,
                    max_attempts = self.reconnect.max_attempts(),
                    delay_secs = delay.as_secs_f64(),
                    "Reconnecting after delay"
                );
                self.metrics.reconnect_attempts_total.inc();
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "Connection state changed");
            self.state = next;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EstablishError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Consumer(#[from] ConsumerError),

    #[error("Broker pipeline setup timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Gave up after {attempts} consecutive reconnect attempts")]
    ReconnectExhausted { attempts: u32 },
}
