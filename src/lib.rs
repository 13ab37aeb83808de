pub mod config;
pub mod contracts;
pub mod delivery;
pub mod messaging;
pub mod metrics;
