//! Persistence boundary for clearance state.
//!
//! [`EInvoiceStore`] owns the e-Invoice records; [`InvoiceRepository`] is the
//! read side of the ERP's invoice tables (plus the single write the
//! cancellation flow makes). Both are object-safe so the service can hold
//! them as `Arc<dyn …>`.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::core::{
    EFaturaResult, EInvoiceRecord, EInvoiceStatus, InvoiceGraph, InvoiceState, NewEInvoice,
};

pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Clearance records, one per invoice plus one per ingested incoming document.
#[async_trait]
pub trait EInvoiceStore: Send + Sync {
    async fn find_by_invoice_id(&self, invoice_id: i64) -> EFaturaResult<Option<EInvoiceRecord>>;

    async fn find_by_uuid(&self, uuid: Uuid) -> EFaturaResult<Option<EInvoiceRecord>>;

    /// Insert a new record. Fails with `Store` on a duplicate invoice id or UUID.
    async fn create(&self, record: NewEInvoice) -> EFaturaResult<EInvoiceRecord>;

    /// Replace the fields of record `id`.
    ///
    /// The status change must be a legal edge, otherwise
    /// `EFaturaError::InvalidTransition` is returned and nothing is written.
    async fn update(&self, id: i64, record: NewEInvoice) -> EFaturaResult<EInvoiceRecord>;

    /// Draft or failure write keyed by `record.invoice_id`: creates the record
    /// or overwrites the existing one without consulting the state machine.
    async fn upsert(&self, record: NewEInvoice) -> EFaturaResult<EInvoiceRecord>;

    /// Conditional write executed before transmission.
    ///
    /// Stores `record` (expected to carry `SENT`) only if no record exists for
    /// the invoice or the existing one does not block sending. Returns `None`
    /// when another caller got there first.
    async fn stage_for_send(&self, record: NewEInvoice) -> EFaturaResult<Option<EInvoiceRecord>>;

    async fn find_by_statuses(
        &self,
        statuses: &[EInvoiceStatus],
    ) -> EFaturaResult<Vec<EInvoiceRecord>>;

    /// Filtered page of records, newest first.
    async fn list(&self, filter: &RecordFilter) -> EFaturaResult<Page<EInvoiceRecord>>;
}

/// Read access to the ERP's invoice graph.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Load an invoice with its customer and order lines.
    ///
    /// Fails with `NotFound` if the invoice, its customer or its order is missing.
    async fn load_invoice_graph(&self, invoice_id: i64) -> EFaturaResult<InvoiceGraph>;

    async fn set_invoice_status(&self, invoice_id: i64, status: InvoiceState) -> EFaturaResult<()>;

    async fn invoice_summary(&self, invoice_id: i64) -> EFaturaResult<Option<InvoiceSummary>>;
}

/// Invoice and customer columns joined into the record list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub grand_total: Decimal,
    pub status: InvoiceState,
    pub customer_name: String,
    pub customer_tax_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub status: Option<EInvoiceStatus>,
    /// Exact match on the raw gateway status.
    pub gib_status: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub end: Option<DateTime<Utc>>,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            status: None,
            gib_status: None,
            start: None,
            end: None,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl RecordFilter {
    /// Clamp page to ≥ 1 and limit to 1..=100.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = self.limit.clamp(1, MAX_PAGE_LIMIT);
        self
    }

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }

    pub fn matches(&self, record: &EInvoiceRecord) -> bool {
        self.status.is_none_or(|s| record.status == s)
            && self
                .gib_status
                .as_deref()
                .is_none_or(|g| record.gib_status.as_deref() == Some(g))
            && self.start.is_none_or(|s| record.created_at >= s)
            && self.end.is_none_or(|e| record.created_at <= e)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.limit.max(1) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_clamps_limits() {
        let f = RecordFilter {
            page: 0,
            limit: 1000,
            ..Default::default()
        }
        .normalized();
        assert_eq!(f.page, 1);
        assert_eq!(f.limit, 100);

        let f = RecordFilter {
            limit: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(f.limit, 1);
    }

    #[test]
    fn offset_is_zero_based() {
        let f = RecordFilter {
            page: 3,
            limit: 20,
            ..Default::default()
        };
        assert_eq!(f.offset(), 40);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<()> = Page {
            items: vec![],
            total: 101,
            page: 1,
            limit: 50,
        };
        assert_eq!(page.total_pages(), 3);
    }
}
