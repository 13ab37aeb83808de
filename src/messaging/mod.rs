pub mod ack;
pub mod channel;
pub mod connection;
pub mod consumer;
pub mod dispatch;
pub mod handler;
pub mod manager;
pub mod reconnect;
pub mod session;

pub use ack::{AckError, Acknowledger, ChannelAcker, InboundMessage};
pub use channel::{ChannelError, ChannelProvider};
pub use connection::{ConnectionError, RabbitMqConnection};
pub use consumer::{Consumer, ConsumerError, SessionEnd};
pub use dispatch::{dispatch, Disposition};
pub use handler::{HandlerError, MessageHandler};
pub use manager::{
    ConnectionManager, ConnectionState, Connector, EstablishError, ManagerError, Session,
};
pub use reconnect::{ReconnectState, ReconnectStep};
pub use session::LapinConnector;
