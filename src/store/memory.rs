use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EInvoiceStore, InvoiceRepository, InvoiceSummary, Page, RecordFilter};
use crate::core::*;

#[derive(Default)]
struct State {
    records: BTreeMap<i64, EInvoiceRecord>,
    next_id: i64,
    invoices: HashMap<i64, Invoice>,
    customers: HashMap<i64, Customer>,
    orders: HashMap<i64, Order>,
}

impl State {
    fn by_invoice_id(&self, invoice_id: i64) -> Option<&EInvoiceRecord> {
        self.records
            .values()
            .find(|r| r.invoice_id == Some(invoice_id))
    }

    fn uuid_taken_by_other(&self, uuid: Uuid, id: Option<i64>) -> bool {
        self.records
            .values()
            .any(|r| r.uuid == uuid && Some(r.id) != id)
    }

    fn insert_new(&mut self, new: NewEInvoice) -> EInvoiceRecord {
        self.next_id += 1;
        let now = Utc::now();
        let record = materialize(self.next_id, new, now, now);
        self.records.insert(record.id, record.clone());
        record
    }

    fn replace(&mut self, existing: &EInvoiceRecord, new: NewEInvoice) -> EInvoiceRecord {
        let record = materialize(existing.id, new, existing.created_at, Utc::now());
        self.records.insert(record.id, record.clone());
        record
    }
}

fn materialize(
    id: i64,
    n: NewEInvoice,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
) -> EInvoiceRecord {
    EInvoiceRecord {
        id,
        invoice_id: n.invoice_id,
        direction: n.direction,
        uuid: n.uuid,
        status: n.status,
        gib_status: n.gib_status,
        xml_content: n.xml_content,
        xml_hash: n.xml_hash,
        gib_response: n.gib_response,
        error_message: n.error_message,
        error_code: n.error_code,
        sender_tax_number: n.sender_tax_number,
        sent_at: n.sent_at,
        received_at: n.received_at,
        created_at,
        updated_at,
    }
}

/// In-process store backing both traits with a single lock.
///
/// Every write takes the lock once, so the check and the write of
/// [`EInvoiceStore::stage_for_send`] cannot interleave with another caller.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an invoice together with its customer and order.
    pub async fn insert_invoice(&self, graph: InvoiceGraph) {
        let mut state = self.state.write().await;
        let InvoiceGraph {
            mut invoice,
            customer,
            order,
        } = graph;
        invoice.customer_id = customer.id;
        invoice.order_id = Some(order.id);
        state.customers.insert(customer.id, customer);
        state.orders.insert(order.id, order);
        state.invoices.insert(invoice.id, invoice);
    }

    pub async fn invoice(&self, invoice_id: i64) -> Option<Invoice> {
        self.state.read().await.invoices.get(&invoice_id).cloned()
    }

    /// Drop an invoice's order, leaving a partially loaded graph.
    pub async fn remove_order(&self, invoice_id: i64) {
        let mut state = self.state.write().await;
        if let Some(order_id) = state.invoices.get(&invoice_id).and_then(|i| i.order_id) {
            state.orders.remove(&order_id);
        }
    }

    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }
}

#[async_trait]
impl EInvoiceStore for MemoryStore {
    async fn find_by_invoice_id(&self, invoice_id: i64) -> EFaturaResult<Option<EInvoiceRecord>> {
        Ok(self.state.read().await.by_invoice_id(invoice_id).cloned())
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> EFaturaResult<Option<EInvoiceRecord>> {
        let state = self.state.read().await;
        Ok(state.records.values().find(|r| r.uuid == uuid).cloned())
    }

    async fn create(&self, record: NewEInvoice) -> EFaturaResult<EInvoiceRecord> {
        let mut state = self.state.write().await;
        if let Some(invoice_id) = record.invoice_id {
            if state.by_invoice_id(invoice_id).is_some() {
                return Err(EFaturaError::Store(format!(
                    "e-Invoice record for invoice {invoice_id} already exists"
                )));
            }
        }
        if state.uuid_taken_by_other(record.uuid, None) {
            return Err(EFaturaError::Store(format!(
                "e-Invoice record with uuid {} already exists",
                record.uuid
            )));
        }
        Ok(state.insert_new(record))
    }

    async fn update(&self, id: i64, record: NewEInvoice) -> EFaturaResult<EInvoiceRecord> {
        let mut state = self.state.write().await;
        let existing = state
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| EFaturaError::NotFound(format!("e-Invoice record {id}")))?;

        if !existing.status.can_transition_to(record.status) {
            return Err(EFaturaError::InvalidTransition {
                from: existing.status,
                to: record.status,
            });
        }
        if state.uuid_taken_by_other(record.uuid, Some(id)) {
            return Err(EFaturaError::Store(format!(
                "uuid {} belongs to another e-Invoice record",
                record.uuid
            )));
        }
        Ok(state.replace(&existing, record))
    }

    async fn upsert(&self, record: NewEInvoice) -> EFaturaResult<EInvoiceRecord> {
        let invoice_id = record
            .invoice_id
            .ok_or_else(|| EFaturaError::Store("upsert requires an invoice id".into()))?;
        let mut state = self.state.write().await;
        let existing = state.by_invoice_id(invoice_id).cloned();
        if state.uuid_taken_by_other(record.uuid, existing.as_ref().map(|r| r.id)) {
            return Err(EFaturaError::Store(format!(
                "uuid {} belongs to another e-Invoice record",
                record.uuid
            )));
        }
        Ok(match existing {
            Some(existing) => state.replace(&existing, record),
            None => state.insert_new(record),
        })
    }

    async fn stage_for_send(&self, record: NewEInvoice) -> EFaturaResult<Option<EInvoiceRecord>> {
        let invoice_id = record
            .invoice_id
            .ok_or_else(|| EFaturaError::Store("stage_for_send requires an invoice id".into()))?;
        let mut state = self.state.write().await;
        match state.by_invoice_id(invoice_id).cloned() {
            Some(existing) if existing.status.blocks_send() => Ok(None),
            Some(existing) => Ok(Some(state.replace(&existing, record))),
            None => Ok(Some(state.insert_new(record))),
        }
    }

    async fn find_by_statuses(
        &self,
        statuses: &[EInvoiceStatus],
    ) -> EFaturaResult<Vec<EInvoiceRecord>> {
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .filter(|r| statuses.contains(&r.status))
            .cloned()
            .collect())
    }

    async fn list(&self, filter: &RecordFilter) -> EFaturaResult<Page<EInvoiceRecord>> {
        let filter = filter.clone().normalized();
        let state = self.state.read().await;
        let mut matching: Vec<&EInvoiceRecord> =
            state.records.values().filter(|r| filter.matches(r)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(Page {
            total: matching.len(),
            items: matching
                .into_iter()
                .skip(filter.offset())
                .take(filter.limit as usize)
                .cloned()
                .collect(),
            page: filter.page,
            limit: filter.limit,
        })
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn load_invoice_graph(&self, invoice_id: i64) -> EFaturaResult<InvoiceGraph> {
        let state = self.state.read().await;
        let invoice = state
            .invoices
            .get(&invoice_id)
            .cloned()
            .ok_or_else(|| EFaturaError::NotFound(format!("invoice {invoice_id}")))?;
        let customer = state
            .customers
            .get(&invoice.customer_id)
            .cloned()
            .ok_or_else(|| {
                EFaturaError::NotFound(format!("customer of invoice {invoice_id}"))
            })?;
        let order = invoice
            .order_id
            .and_then(|id| state.orders.get(&id))
            .cloned()
            .ok_or_else(|| EFaturaError::NotFound(format!("order of invoice {invoice_id}")))?;

        Ok(InvoiceGraph {
            invoice,
            customer,
            order,
        })
    }

    async fn set_invoice_status(&self, invoice_id: i64, status: InvoiceState) -> EFaturaResult<()> {
        let mut state = self.state.write().await;
        let invoice = state
            .invoices
            .get_mut(&invoice_id)
            .ok_or_else(|| EFaturaError::NotFound(format!("invoice {invoice_id}")))?;
        invoice.status = status;
        Ok(())
    }

    async fn invoice_summary(&self, invoice_id: i64) -> EFaturaResult<Option<InvoiceSummary>> {
        let state = self.state.read().await;
        let Some(invoice) = state.invoices.get(&invoice_id) else {
            return Ok(None);
        };
        let customer = state.customers.get(&invoice.customer_id);
        Ok(Some(InvoiceSummary {
            invoice_id,
            invoice_number: invoice.document_number(),
            grand_total: invoice.grand_total,
            status: invoice.status,
            customer_name: customer
                .map(|c| c.display_name().to_string())
                .unwrap_or_default(),
            customer_tax_number: customer.and_then(|c| c.tax_number().map(str::to_string)),
        }))
    }
}
