pub mod delivery_outcome;
pub mod registro;

pub use delivery_outcome::DeliveryOutcome;
pub use registro::{PayloadError, RegistroPersonas};
