//! Lifecycle status enums and their transition tables.
//!
//! Statuses used to be free-form strings checked against ad hoc arrays in each
//! handler; they are consolidated here so every transition goes through one
//! `allowed` table that handlers and services share.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Placed,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Forward-only progression, with `cancelled` as a branch from any
    /// non-terminal state. `delivered` and `cancelled` are terminal.
    pub fn allowed(from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::*;
        match (from, to) {
            (Placed, Confirmed) | (Placed, Processing) => true,
            (Confirmed, Processing) => true,
            (Processing, Shipped) => true,
            (Shipped, Delivered) => true,
            (Placed | Confirmed | Processing | Shipped, Cancelled) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Placed => "placed",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(Self::Placed),
            "confirmed" => Ok(Self::Confirmed),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    #[default]
    Requested,
    Approved,
    Rejected,
    Refunded,
}

impl ReturnStatus {
    pub fn allowed(from: ReturnStatus, to: ReturnStatus) -> bool {
        use ReturnStatus::*;
        matches!(
            (from, to),
            (Requested, Approved) | (Requested, Rejected) | (Approved, Refunded)
        )
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ReturnStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(Self::Requested),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "refunded" => Ok(Self::Refunded),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementStatus {
    #[default]
    Requested,
    Approved,
    Rejected,
    Shipped,
    Completed,
}

impl ReplacementStatus {
    pub fn allowed(from: ReplacementStatus, to: ReplacementStatus) -> bool {
        use ReplacementStatus::*;
        matches!(
            (from, to),
            (Requested, Approved)
                | (Requested, Rejected)
                | (Approved, Shipped)
                | (Shipped, Completed)
        )
    }
}

impl fmt::Display for ReplacementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ReplacementStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(Self::Requested),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "shipped" => Ok(Self::Shipped),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Countered,
}

impl NegotiationStatus {
    pub fn allowed(from: NegotiationStatus, to: NegotiationStatus) -> bool {
        use NegotiationStatus::*;
        matches!(
            (from, to),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Countered)
                | (Countered, Approved)
                | (Countered, Rejected)
        )
    }
}

impl fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Countered => "countered",
        };
        write!(f, "{s}")
    }
}

impl FromStr for NegotiationStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "countered" => Ok(Self::Countered),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_progression_is_forward_only() {
        use OrderStatus::*;
        assert!(OrderStatus::allowed(Placed, Confirmed));
        assert!(OrderStatus::allowed(Confirmed, Processing));
        assert!(OrderStatus::allowed(Processing, Shipped));
        assert!(OrderStatus::allowed(Shipped, Delivered));
        // No going back.
        assert!(!OrderStatus::allowed(Delivered, Placed));
        assert!(!OrderStatus::allowed(Shipped, Processing));
        assert!(!OrderStatus::allowed(Delivered, Shipped));
    }

    #[test]
    fn cancel_branches_from_non_terminal_only() {
        use OrderStatus::*;
        for from in [Placed, Confirmed, Processing, Shipped] {
            assert!(OrderStatus::allowed(from, Cancelled));
        }
        assert!(!OrderStatus::allowed(Delivered, Cancelled));
        assert!(!OrderStatus::allowed(Cancelled, Cancelled));
    }

    #[test]
    fn return_refund_requires_approval() {
        use ReturnStatus::*;
        assert!(ReturnStatus::allowed(Requested, Approved));
        assert!(ReturnStatus::allowed(Approved, Refunded));
        assert!(!ReturnStatus::allowed(Requested, Refunded));
        assert!(!ReturnStatus::allowed(Rejected, Refunded));
        assert!(!ReturnStatus::allowed(Refunded, Refunded));
    }

    #[test]
    fn replacement_flow() {
        use ReplacementStatus::*;
        assert!(ReplacementStatus::allowed(Approved, Shipped));
        assert!(ReplacementStatus::allowed(Shipped, Completed));
        assert!(!ReplacementStatus::allowed(Rejected, Shipped));
        assert!(!ReplacementStatus::allowed(Requested, Completed));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in ["placed", "confirmed", "processing", "shipped", "delivered", "cancelled"] {
            assert_eq!(s.parse::<OrderStatus>().unwrap().to_string(), s);
        }
        assert!("unknown".parse::<OrderStatus>().is_err());
    }
}
