//! Transport client for the GIB e-Invoice clearance gateway.
//!
//! Every operation posts a SOAP 1.1 envelope to its own path under the
//! configured base URL and parses the `{Op}Result` element of the answer.
//! The client performs no retries and touches no local state; callers get
//! a [`TransportError`] for network failures, non-2xx answers, SOAP faults
//! and unparseable bodies alike.

mod client;
pub(crate) mod envelope;
pub mod response;

pub use client::GibClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::{EInvoiceStatus, TransportError};

/// Result of a `SendInvoice` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceResult {
    pub success: bool,
    /// Gateway-side invoice identifier.
    pub invoice_id: String,
    /// ETTN echoed by the gateway; may be empty.
    pub uuid: String,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    /// The whole `SendInvoiceResult` element as JSON, for diagnostics.
    pub raw: serde_json::Value,
}

/// Remote status of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStatusReport {
    pub uuid: String,
    /// Canonical status mapped from `gib_status`.
    pub status: EInvoiceStatus,
    /// Raw status string as reported.
    pub gib_status: Option<String>,
    pub status_date: DateTime<Utc>,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
}

/// An invoice addressed to us, as listed by `GetIncomingInvoices`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingInvoice {
    pub uuid: String,
    pub invoice_number: Option<String>,
    pub sender_tax_number: Option<String>,
    pub sender_name: Option<String>,
    pub issue_date: Option<String>,
    pub payable_amount: Option<String>,
    /// Decoded UBL document, when the listing carries it.
    pub content: Option<String>,
}

/// Answer to an incoming invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseDecision {
    Accepted,
    Rejected,
}

impl ResponseDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Local status the record takes once the gateway confirms the answer.
    pub fn resulting_status(&self) -> EInvoiceStatus {
        match self {
            Self::Accepted => EInvoiceStatus::Approved,
            Self::Rejected => EInvoiceStatus::Rejected,
        }
    }
}

impl FromStr for ResponseDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(format!("status must be ACCEPTED or REJECTED, got '{other}'")),
        }
    }
}

/// Rendered report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Html,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Html => "HTML",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Html => "text/html; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PDF" => Ok(Self::Pdf),
            "HTML" => Ok(Self::Html),
            other => Err(format!("format must be PDF or HTML, got '{other}'")),
        }
    }
}

/// Operations of the clearance gateway.
#[async_trait]
pub trait GibGateway: Send + Sync {
    /// Submit a UBL-TR document.
    async fn send_invoice(&self, xml: &str) -> Result<SendInvoiceResult, TransportError>;

    async fn check_invoice_status(&self, uuid: Uuid)
    -> Result<InvoiceStatusReport, TransportError>;

    /// Invoices addressed to us over the last seven days.
    async fn get_incoming_invoices(&self) -> Result<Vec<IncomingInvoice>, TransportError>;

    /// Accept or reject an incoming invoice. `Ok(false)` means the gateway refused.
    async fn send_invoice_response(
        &self,
        uuid: Uuid,
        decision: ResponseDecision,
        reason: Option<&str>,
    ) -> Result<bool, TransportError>;

    /// `Ok(false)` means the gateway refused the cancellation.
    async fn cancel_invoice(&self, uuid: Uuid, reason: &str) -> Result<bool, TransportError>;

    /// Rendered document, `None` when the gateway returned no content.
    async fn get_invoice_report(
        &self,
        uuid: Uuid,
        format: ReportFormat,
    ) -> Result<Option<Vec<u8>>, TransportError>;

    /// Whether the gateway answers at all.
    async fn test_connection(&self) -> bool;
}
