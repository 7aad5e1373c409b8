use std::collections::BTreeSet;

use futures::future::join_all;
use tracing::{info, instrument};

use super::{BatchSummary, EInvoiceService};
use crate::core::{EFaturaResult, EInvoiceStatus};

impl EInvoiceService {
    /// Send every invoice concurrently and tally the outcomes.
    ///
    /// One slow or failing send does not hold up or abort the others.
    #[instrument(skip(self, invoice_ids), fields(count = invoice_ids.len()))]
    pub async fn send_batch(&self, invoice_ids: &[i64]) -> BatchSummary {
        let outcomes = join_all(invoice_ids.iter().map(|&id| self.send_e_invoice(id))).await;
        let summary = BatchSummary::from_outcomes(outcomes);
        info!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            "batch send finished"
        );
        summary
    }

    /// Resend every outgoing record that is `PENDING` or `REJECTED`.
    #[instrument(skip(self))]
    pub async fn retry_failed(&self) -> EFaturaResult<BatchSummary> {
        let retryable: Vec<EInvoiceStatus> = EInvoiceStatus::ALL
            .into_iter()
            .filter(|s| s.is_retryable())
            .collect();
        let records = self.store.find_by_statuses(&retryable).await?;
        let invoice_ids: Vec<i64> = records
            .iter()
            .filter_map(|r| r.invoice_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        info!(count = invoice_ids.len(), "retrying failed e-Invoices");
        Ok(self.send_batch(&invoice_ids).await)
    }
}
