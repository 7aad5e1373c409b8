use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Clearance lifecycle of an e-Invoice record.
///
/// ```text
/// PENDING ──► SENT ──► RECEIVED ──► APPROVED ──► CANCELLED
///    │          │          │
///    └► REJECTED ◄─────────┘
/// ```
///
/// `REJECTED → SENT` is the resubmission edge used by retries.
/// `CANCELLED` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EInvoiceStatus {
    /// Draft generated, not transmitted.
    Pending,
    /// Accepted for transmission by the gateway.
    Sent,
    /// Delivered to the recipient's mailbox (or ingested from our mailbox).
    Received,
    /// Accepted by the recipient.
    Approved,
    /// Refused by the gateway or the recipient.
    Rejected,
    /// Withdrawn. Terminal.
    Cancelled,
}

impl EInvoiceStatus {
    pub const ALL: [EInvoiceStatus; 6] = [
        Self::Pending,
        Self::Sent,
        Self::Received,
        Self::Approved,
        Self::Rejected,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Received => "RECEIVED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether a stored record may move from `self` to `next`.
    ///
    /// Writing the current status again is always allowed.
    pub fn can_transition_to(self, next: EInvoiceStatus) -> bool {
        use EInvoiceStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Sent)
                | (Pending, Rejected)
                | (Sent, Received)
                | (Sent, Approved)
                | (Sent, Rejected)
                | (Sent, Cancelled)
                | (Received, Approved)
                | (Received, Rejected)
                | (Received, Cancelled)
                | (Approved, Cancelled)
                | (Rejected, Sent)
                | (Rejected, Cancelled)
        )
    }

    /// Statuses in which a new transmission is refused.
    pub fn blocks_send(self) -> bool {
        matches!(
            self,
            Self::Sent | Self::Received | Self::Approved | Self::Cancelled
        )
    }

    /// Statuses swept by the retry-failed operation.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Pending | Self::Rejected)
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Cancelled
    }
}

impl fmt::Display for EInvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EInvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "SENT" => Ok(Self::Sent),
            "RECEIVED" => Ok(Self::Received),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(format!("unknown e-Invoice status '{other}'")),
        }
    }
}

/// Map a raw gateway status string onto the canonical lifecycle.
///
/// Unknown values map to `Pending`: an unrecognised status is never
/// promoted to a terminal one.
pub fn map_gib_status(raw: &str) -> EInvoiceStatus {
    match raw.trim().to_ascii_uppercase().as_str() {
        "PENDING" => EInvoiceStatus::Pending,
        "SENT" => EInvoiceStatus::Sent,
        "DELIVERED" => EInvoiceStatus::Received,
        "APPROVED" => EInvoiceStatus::Approved,
        "REJECTED" => EInvoiceStatus::Rejected,
        "CANCELLED" => EInvoiceStatus::Cancelled,
        _ => EInvoiceStatus::Pending,
    }
}
