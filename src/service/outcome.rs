use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::EInvoiceStatus;
use crate::gib::InvoiceStatusReport;

/// Result of one send attempt. Sending never returns an error; every
/// failure is recorded on the e-Invoice record and reported here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "outcome",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum SendOutcome {
    /// Accepted by the gateway; the record is `SENT`.
    Sent {
        invoice_id: i64,
        uuid: Uuid,
        gib_invoice_id: String,
    },
    /// The record was already transmitted (or another caller won the race).
    /// Nothing was sent.
    AlreadySent {
        invoice_id: i64,
        uuid: Uuid,
        status: EInvoiceStatus,
    },
    /// Validation, generation, gateway refusal or transport failure.
    /// The record is `REJECTED` with the same message and code.
    Failed {
        invoice_id: i64,
        uuid: Option<Uuid>,
        error_message: String,
        error_code: Option<String>,
    },
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    pub fn invoice_id(&self) -> i64 {
        match self {
            Self::Sent { invoice_id, .. }
            | Self::AlreadySent { invoice_id, .. }
            | Self::Failed { invoice_id, .. } => *invoice_id,
        }
    }

    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            Self::Sent { uuid, .. } | Self::AlreadySent { uuid, .. } => Some(*uuid),
            Self::Failed { uuid, .. } => *uuid,
        }
    }

    /// Human-readable summary for API responses.
    pub fn message(&self) -> String {
        match self {
            Self::Sent { .. } => "e-Invoice sent to GIB".to_string(),
            Self::AlreadySent { status, .. } => format!("Invoice already sent (status {status})"),
            Self::Failed { error_message, .. } => error_message.clone(),
        }
    }
}

/// Result of a remote status check.
///
/// `Failed` means the check itself failed; the document's status is
/// unknown, not pending.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "result",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum StatusCheck {
    Checked(InvoiceStatusReport),
    Failed {
        uuid: Uuid,
        status: EInvoiceStatus,
        status_date: DateTime<Utc>,
        error_message: String,
    },
}

impl StatusCheck {
    pub fn is_checked(&self) -> bool {
        matches!(self, Self::Checked(_))
    }

    pub fn status(&self) -> EInvoiceStatus {
        match self {
            Self::Checked(report) => report.status,
            Self::Failed { status, .. } => *status,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Checked(report) => report.error_message.as_deref(),
            Self::Failed { error_message, .. } => Some(error_message),
        }
    }
}

/// Tally of a batch send.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<SendOutcome>,
}

impl BatchSummary {
    pub fn from_outcomes(results: Vec<SendOutcome>) -> Self {
        let successful = results.iter().filter(|o| o.is_success()).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        }
    }
}
