use serde::{Deserialize, Serialize};

/// What happened to a record sent to the registro endpoint.
///
/// Both variants settle the message positively:
/// - `Delivered`: the endpoint answered with a 2xx status.
/// - `Absorbed`: the endpoint was unreachable or answered with an error
///   status. The failure is logged and dropped so the broker does not
///   redeliver into an API outage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { status: u16 },

    Absorbed { reason: String },
}

impl DeliveryOutcome {
    pub fn delivered(status: u16) -> Self {
        Self::Delivered { status }
    }

    pub fn absorbed(reason: impl Into<String>) -> Self {
        Self::Absorbed {
            reason: reason.into(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn is_absorbed(&self) -> bool {
        matches!(self, Self::Absorbed { .. })
    }

    /// Metric label for this outcome.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Delivered { .. } => "delivered",
            Self::Absorbed { .. } => "absorbed",
        }
    }
}

impl std::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivered { status } => write!(f, "Delivered with status {}", status),
            Self::Absorbed { reason } => write!(f, "Delivery failure absorbed: {}", reason),
        }
    }
}
