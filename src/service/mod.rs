//! Orchestration of the clearance workflow.
//!
//! [`EInvoiceService`] decides whether a send is allowed, builds the
//! document, talks to the gateway and keeps the e-Invoice record in step
//! with what the gateway reported.

mod batch;
mod outcome;
mod poller;

pub use outcome::{BatchSummary, SendOutcome, StatusCheck};
pub use poller::IncomingPoller;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::core::*;
use crate::gib::{GibGateway, IncomingInvoice, ReportFormat, ResponseDecision};
use crate::store::{EInvoiceStore, InvoiceRepository, InvoiceSummary, Page, RecordFilter};
use crate::ubl::{self, UblDocument};

/// A record joined with the invoice and customer columns shown in lists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordListItem {
    #[serde(flatten)]
    pub record: EInvoiceRecord,
    pub invoice: Option<InvoiceSummary>,
}

pub struct EInvoiceService {
    store: Arc<dyn EInvoiceStore>,
    invoices: Arc<dyn InvoiceRepository>,
    gateway: Arc<dyn GibGateway>,
    company: CompanyIdentity,
}

impl EInvoiceService {
    pub fn new(
        store: Arc<dyn EInvoiceStore>,
        invoices: Arc<dyn InvoiceRepository>,
        gateway: Arc<dyn GibGateway>,
        company: CompanyIdentity,
    ) -> Self {
        Self {
            store,
            invoices,
            gateway,
            company,
        }
    }

    pub fn company(&self) -> &CompanyIdentity {
        &self.company
    }

    /// ETTN for a new document: kept once the gateway has accepted the
    /// record, fresh otherwise.
    fn uuid_for(existing: Option<&EInvoiceRecord>) -> Uuid {
        match existing {
            Some(record) if record.was_transmitted() => record.uuid,
            _ => Uuid::new_v4(),
        }
    }

    async fn build(
        &self,
        graph: &InvoiceGraph,
        existing: Option<&EInvoiceRecord>,
    ) -> EFaturaResult<UblDocument> {
        ubl::build_document(graph, &self.company, Self::uuid_for(existing))
    }

    /// Regenerate the document and reset the record to `PENDING`.
    ///
    /// This is the only way back to `PENDING`. Reverting a record that has
    /// already been transmitted is allowed but logged; a cancelled record
    /// cannot be redrafted.
    #[instrument(skip(self))]
    pub async fn generate_xml(&self, invoice_id: i64) -> EFaturaResult<EInvoiceRecord> {
        let graph = self.invoices.load_invoice_graph(invoice_id).await?;
        let existing = self.store.find_by_invoice_id(invoice_id).await?;

        if let Some(record) = &existing {
            if record.status.is_terminal() {
                return Err(EFaturaError::InvalidTransition {
                    from: record.status,
                    to: EInvoiceStatus::Pending,
                });
            }
            if record.status != EInvoiceStatus::Pending && record.status != EInvoiceStatus::Rejected
            {
                warn!(
                    invoice_id,
                    uuid = %record.uuid,
                    status = %record.status,
                    "redraft reverts a transmitted e-Invoice to PENDING"
                );
            }
        }

        let doc = self.build(&graph, existing.as_ref()).await?;
        let draft = match &existing {
            Some(record) => {
                let mut draft = NewEInvoice::from(record).clear_error();
                draft.uuid = doc.uuid;
                draft.status = EInvoiceStatus::Pending;
                draft
            }
            None => NewEInvoice::outgoing(invoice_id, doc.uuid, EInvoiceStatus::Pending),
        }
        .with_document(doc.xml, doc.xml_hash);

        let record = self.store.upsert(draft).await?;
        info!(invoice_id, uuid = %record.uuid, "e-Invoice XML generated");
        Ok(record)
    }

    /// Submit an invoice for clearance.
    ///
    /// Never fails: every error ends up in the returned outcome and, unless
    /// the store itself is down, on the persisted record.
    #[instrument(skip(self))]
    pub async fn send_e_invoice(&self, invoice_id: i64) -> SendOutcome {
        let existing = match self.store.find_by_invoice_id(invoice_id).await {
            Ok(existing) => existing,
            Err(e) => return self.fail_before_staging(invoice_id, None, e).await,
        };

        if let Some(record) = &existing {
            if record.status.blocks_send() {
                warn!(invoice_id, status = %record.status, "invoice already sent to GIB");
                return SendOutcome::AlreadySent {
                    invoice_id,
                    uuid: record.uuid,
                    status: record.status,
                };
            }
        }

        let doc = match self.prepare(invoice_id, existing.as_ref()).await {
            Ok(doc) => doc,
            Err(e) => return self.fail_before_staging(invoice_id, existing.as_ref(), e).await,
        };

        let previous_sent_at = existing.as_ref().and_then(|r| r.sent_at);
        let mut staged = match &existing {
            Some(record) => NewEInvoice::from(record).clear_error(),
            None => NewEInvoice::outgoing(invoice_id, doc.uuid, EInvoiceStatus::Sent),
        }
        .with_document(doc.xml.clone(), doc.xml_hash.clone());
        staged.uuid = doc.uuid;
        staged.status = EInvoiceStatus::Sent;
        staged.sent_at = Some(Utc::now());

        let staged = match self.store.stage_for_send(staged).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                let current = self.store.find_by_invoice_id(invoice_id).await.ok().flatten();
                warn!(invoice_id, "concurrent send won the race, not transmitting");
                return SendOutcome::AlreadySent {
                    invoice_id,
                    uuid: current.as_ref().map_or(doc.uuid, |r| r.uuid),
                    status: current.map_or(EInvoiceStatus::Sent, |r| r.status),
                };
            }
            Err(e) => return self.fail_before_staging(invoice_id, existing.as_ref(), e).await,
        };

        info!(invoice_id, uuid = %staged.uuid, "sending e-Invoice to GIB");
        match self.gateway.send_invoice(&doc.xml).await {
            Ok(result) if result.success => {
                let mut sent = NewEInvoice::from(&staged).clear_error();
                sent.gib_response = Some(result.raw.clone());
                if previous_sent_at.is_none() {
                    if let Ok(remote) = Uuid::parse_str(result.uuid.trim()) {
                        if remote != staged.uuid {
                            info!(invoice_id, local = %staged.uuid, remote = %remote, "adopting gateway UUID");
                            sent.uuid = remote;
                        }
                    }
                }
                let uuid = match self.store.update(staged.id, sent).await {
                    Ok(record) => record.uuid,
                    Err(e) => {
                        error!(invoice_id, error = %e, "e-Invoice sent but response not stored");
                        staged.uuid
                    }
                };
                info!(invoice_id, %uuid, "e-Invoice sent");
                SendOutcome::Sent {
                    invoice_id,
                    uuid,
                    gib_invoice_id: result.invoice_id,
                }
            }
            Ok(result) => {
                let message = result
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "rejected by GIB".to_string());
                warn!(invoice_id, error = %message, code = ?result.error_code, "GIB refused e-Invoice");
                self.mark_rejected(
                    &staged,
                    previous_sent_at,
                    &message,
                    result.error_code.clone(),
                    Some(result.raw),
                )
                .await
            }
            Err(e) => {
                error!(invoice_id, error = %e, "failed to send e-Invoice");
                self.mark_rejected(
                    &staged,
                    previous_sent_at,
                    &e.to_string(),
                    Some(e.code().to_string()),
                    None,
                )
                .await
            }
        }
    }

    /// Load, validate and build. Anything failing here happens before the
    /// record is staged.
    async fn prepare(
        &self,
        invoice_id: i64,
        existing: Option<&EInvoiceRecord>,
    ) -> EFaturaResult<UblDocument> {
        let graph = self.invoices.load_invoice_graph(invoice_id).await?;
        let errors = validate_for_submission(&graph, &self.company);
        if !errors.is_empty() {
            return Err(join_validation_errors(&errors));
        }
        self.build(&graph, existing).await
    }

    async fn fail_before_staging(
        &self,
        invoice_id: i64,
        existing: Option<&EInvoiceRecord>,
        err: EFaturaError,
    ) -> SendOutcome {
        error!(invoice_id, error = %err, "e-Invoice send failed");
        let message = err.to_string();
        let code = err.code().to_string();

        let mut failed = match existing {
            Some(record) => NewEInvoice::from(record),
            None => NewEInvoice::outgoing(invoice_id, Uuid::new_v4(), EInvoiceStatus::Rejected),
        }
        .with_error(message.clone(), Some(code.clone()));
        failed.status = EInvoiceStatus::Rejected;

        let uuid = match self.store.upsert(failed).await {
            Ok(record) => Some(record.uuid),
            Err(store_err) => {
                error!(invoice_id, error = %store_err, "could not record send failure");
                existing.map(|r| r.uuid)
            }
        };

        SendOutcome::Failed {
            invoice_id,
            uuid,
            error_message: message,
            error_code: Some(code),
        }
    }

    async fn mark_rejected(
        &self,
        staged: &EInvoiceRecord,
        previous_sent_at: Option<chrono::DateTime<Utc>>,
        message: &str,
        code: Option<String>,
        gib_response: Option<serde_json::Value>,
    ) -> SendOutcome {
        let mut rejected = NewEInvoice::from(staged).with_error(message, code.clone());
        rejected.status = EInvoiceStatus::Rejected;
        rejected.sent_at = previous_sent_at;
        if gib_response.is_some() {
            rejected.gib_response = gib_response;
        }
        let invoice_id = staged.invoice_id.unwrap_or_default();
        if let Err(e) = self.store.update(staged.id, rejected).await {
            error!(invoice_id, error = %e, "could not record rejection");
        }
        SendOutcome::Failed {
            invoice_id,
            uuid: Some(staged.uuid),
            error_message: message.to_string(),
            error_code: code,
        }
    }

    /// Ask the gateway for a document's status and reconcile the local record.
    #[instrument(skip(self))]
    pub async fn check_invoice_status(&self, uuid: Uuid) -> StatusCheck {
        let mut report = match self.gateway.check_invoice_status(uuid).await {
            Ok(report) => report,
            Err(e) => {
                warn!(%uuid, error = %e, "status check failed");
                return StatusCheck::Failed {
                    uuid,
                    status: EInvoiceStatus::Pending,
                    status_date: Utc::now(),
                    error_message: e.to_string(),
                };
            }
        };
        if report.uuid.is_empty() {
            report.uuid = uuid.to_string();
        }

        match self.store.find_by_uuid(uuid).await {
            Ok(Some(record)) => {
                let mut next = NewEInvoice::from(&record);
                next.gib_status = report.gib_status.clone();
                next.gib_response = serde_json::to_value(&report).ok();
                if record.status.can_transition_to(report.status) {
                    next.status = report.status;
                } else {
                    warn!(
                        %uuid,
                        from = %record.status,
                        to = %report.status,
                        gib_status = ?report.gib_status,
                        "ignoring illegal remote status transition"
                    );
                }
                match self.store.update(record.id, next).await {
                    Ok(updated) => debug!(%uuid, status = %updated.status, "status reconciled"),
                    Err(e) => error!(%uuid, error = %e, "could not store status"),
                }
            }
            Ok(None) => debug!(%uuid, "no local record for status check"),
            Err(e) => error!(%uuid, error = %e, "could not load record for status check"),
        }

        StatusCheck::Checked(report)
    }

    /// Fetch invoices addressed to us and record the new ones as `RECEIVED`.
    ///
    /// Returns the full fetched list, including entries already known.
    #[instrument(skip(self))]
    pub async fn receive_incoming_invoices(&self) -> EFaturaResult<Vec<IncomingInvoice>> {
        let incoming = self.gateway.get_incoming_invoices().await?;
        let mut created = 0usize;

        for invoice in &incoming {
            let Ok(uuid) = Uuid::parse_str(invoice.uuid.trim()) else {
                warn!(uuid = %invoice.uuid, "skipping incoming invoice with malformed UUID");
                continue;
            };
            match self.store.find_by_uuid(uuid).await {
                Ok(Some(_)) => {
                    debug!(%uuid, "incoming invoice already processed");
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(%uuid, error = %e, "could not check incoming invoice");
                    continue;
                }
            }

            let mut record = NewEInvoice::incoming(uuid, Utc::now());
            record.sender_tax_number = invoice.sender_tax_number.clone();
            record.gib_response = serde_json::to_value(invoice).ok();
            if let Some(xml) = &invoice.content {
                record = record.with_document(xml.clone(), ubl::content_hash(xml));
            }
            match self.store.create(record).await {
                Ok(_) => {
                    created += 1;
                    info!(%uuid, "incoming invoice recorded");
                }
                Err(e) => error!(%uuid, error = %e, "could not record incoming invoice"),
            }
        }

        info!(fetched = incoming.len(), created, "incoming invoices received");
        Ok(incoming)
    }

    /// Accept or reject an incoming invoice.
    ///
    /// `Ok(false)` means the gateway refused the answer; nothing is stored.
    #[instrument(skip(self))]
    pub async fn send_invoice_response(
        &self,
        uuid: Uuid,
        decision: ResponseDecision,
        reason: Option<&str>,
    ) -> EFaturaResult<bool> {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        if decision == ResponseDecision::Rejected && reason.is_none() {
            return Err(EFaturaError::Validation(
                "reason is required when rejecting".into(),
            ));
        }

        let existing = self.store.find_by_uuid(uuid).await?;
        if let Some(record) = &existing {
            let next = decision.resulting_status();
            if !record.status.can_transition_to(next) {
                return Err(EFaturaError::InvalidTransition {
                    from: record.status,
                    to: next,
                });
            }
        }

        let accepted = self
            .gateway
            .send_invoice_response(uuid, decision, reason)
            .await?;
        if !accepted {
            warn!(%uuid, decision = decision.as_str(), "GIB refused invoice response");
            return Ok(false);
        }

        match existing {
            Some(record) => {
                let mut next = NewEInvoice::from(&record);
                next.status = decision.resulting_status();
                next.gib_response = Some(serde_json::json!({
                    "status": decision.as_str(),
                    "reason": reason,
                }));
                self.store.update(record.id, next).await?;
            }
            None => warn!(%uuid, "invoice response sent for unknown record"),
        }
        info!(%uuid, decision = decision.as_str(), "invoice response sent");
        Ok(true)
    }

    /// Cancel a transmitted invoice.
    ///
    /// Fails with `NotFound` before any gateway call when the invoice has no
    /// record. On gateway success both the record and the invoice become
    /// `CANCELLED`; on refusal or error neither is touched.
    #[instrument(skip(self))]
    pub async fn cancel_invoice(&self, invoice_id: i64, reason: &str) -> EFaturaResult<bool> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EFaturaError::Validation("reason is required".into()));
        }
        let record = self
            .store
            .find_by_invoice_id(invoice_id)
            .await?
            .ok_or_else(|| EFaturaError::NotFound(format!("e-Invoice for invoice {invoice_id}")))?;
        if !record.status.can_transition_to(EInvoiceStatus::Cancelled) {
            return Err(EFaturaError::InvalidTransition {
                from: record.status,
                to: EInvoiceStatus::Cancelled,
            });
        }

        info!(invoice_id, uuid = %record.uuid, "cancelling e-Invoice");
        if !self.gateway.cancel_invoice(record.uuid, reason).await? {
            warn!(invoice_id, "GIB refused cancellation");
            return Ok(false);
        }

        let mut next = NewEInvoice::from(&record);
        next.status = EInvoiceStatus::Cancelled;
        next.gib_response = Some(serde_json::json!({ "cancelled": true, "reason": reason }));
        self.store.update(record.id, next).await?;
        self.invoices
            .set_invoice_status(invoice_id, InvoiceState::Cancelled)
            .await?;
        info!(invoice_id, "e-Invoice cancelled");
        Ok(true)
    }

    #[instrument(skip(self))]
    pub async fn get_invoice_report(
        &self,
        uuid: Uuid,
        format: ReportFormat,
    ) -> EFaturaResult<Option<Vec<u8>>> {
        Ok(self.gateway.get_invoice_report(uuid, format).await?)
    }

    pub async fn get_record(&self, invoice_id: i64) -> EFaturaResult<EInvoiceRecord> {
        self.store
            .find_by_invoice_id(invoice_id)
            .await?
            .ok_or_else(|| EFaturaError::NotFound(format!("e-Invoice for invoice {invoice_id}")))
    }

    /// Stored document of an invoice's record.
    pub async fn get_xml(&self, invoice_id: i64) -> EFaturaResult<String> {
        self.get_record(invoice_id)
            .await?
            .xml_content
            .ok_or_else(|| EFaturaError::NotFound(format!("XML for invoice {invoice_id}")))
    }

    pub async fn list_records(&self, filter: RecordFilter) -> EFaturaResult<Page<RecordListItem>> {
        let page = self.store.list(&filter).await?;
        let mut items = Vec::with_capacity(page.items.len());
        for record in page.items {
            let invoice = match record.invoice_id {
                Some(id) => self.invoices.invoice_summary(id).await?,
                None => None,
            };
            items.push(RecordListItem { record, invoice });
        }
        Ok(Page {
            items,
            total: page.total,
            page: page.page,
            limit: page.limit,
        })
    }

    pub async fn gateway_reachable(&self) -> bool {
        self.gateway.test_connection().await
    }
}
