#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use efatura::core::*;
use efatura::gib::{
    GibGateway, IncomingInvoice, InvoiceStatusReport, ReportFormat, ResponseDecision,
    SendInvoiceResult,
};
use efatura::service::EInvoiceService;
use efatura::store::MemoryStore;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// How the fake gateway answers `SendInvoice`.
#[derive(Debug, Clone)]
pub enum SendMode {
    Accept,
    /// Accept and report this ETTN instead of the one in the document.
    AcceptWithUuid(Uuid),
    Refuse { code: String, message: String },
    Fail(TransportError),
}

/// In-process gateway with scripted answers and call counters.
pub struct FakeGateway {
    pub send_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub response_calls: AtomicUsize,
    pub send_mode: Mutex<SendMode>,
    /// Documents containing any of these markers fail with a network error.
    pub fail_markers: Mutex<Vec<String>>,
    pub remote_status: Mutex<Result<String, TransportError>>,
    pub incoming: Mutex<Result<Vec<IncomingInvoice>, TransportError>>,
    pub cancel_accepted: AtomicBool,
    pub response_accepted: AtomicBool,
    pub report: Mutex<Option<Vec<u8>>>,
    pub reachable: AtomicBool,
    pub sent_documents: Mutex<Vec<String>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            send_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
            response_calls: AtomicUsize::new(0),
            send_mode: Mutex::new(SendMode::Accept),
            fail_markers: Mutex::new(Vec::new()),
            remote_status: Mutex::new(Ok("SENT".into())),
            incoming: Mutex::new(Ok(Vec::new())),
            cancel_accepted: AtomicBool::new(true),
            response_accepted: AtomicBool::new(true),
            report: Mutex::new(Some(b"%PDF-1.4".to_vec())),
            reachable: AtomicBool::new(true),
            sent_documents: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    pub fn set_send_mode(&self, mode: SendMode) {
        *self.send_mode.lock().unwrap() = mode;
    }

    pub fn fail_documents_containing(&self, marker: impl Into<String>) {
        self.fail_markers.lock().unwrap().push(marker.into());
    }

    pub fn set_remote_status(&self, status: &str) {
        *self.remote_status.lock().unwrap() = Ok(status.to_string());
    }

    pub fn set_status_error(&self, err: TransportError) {
        *self.remote_status.lock().unwrap() = Err(err);
    }

    pub fn set_incoming(&self, list: Vec<IncomingInvoice>) {
        *self.incoming.lock().unwrap() = Ok(list);
    }

    pub fn sends(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

fn cbc_uuid(xml: &str) -> String {
    xml.split("<cbc:UUID>")
        .nth(1)
        .and_then(|rest| rest.split("</cbc:UUID>").next())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl GibGateway for FakeGateway {
    async fn send_invoice(&self, xml: &str) -> Result<SendInvoiceResult, TransportError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        self.sent_documents.lock().unwrap().push(xml.to_string());
        tokio::task::yield_now().await;

        if self
            .fail_markers
            .lock()
            .unwrap()
            .iter()
            .any(|m| xml.contains(m.as_str()))
        {
            return Err(TransportError::Network("connection reset".into()));
        }

        let mode = self.send_mode.lock().unwrap().clone();
        match mode {
            SendMode::Accept | SendMode::AcceptWithUuid(_) => {
                let uuid = match mode {
                    SendMode::AcceptWithUuid(remote) => remote.to_string(),
                    _ => cbc_uuid(xml),
                };
                Ok(SendInvoiceResult {
                    success: true,
                    invoice_id: "GIB2024000000001".into(),
                    uuid: uuid.clone(),
                    error_message: None,
                    error_code: None,
                    raw: serde_json::json!({ "success": "true", "uuid": uuid }),
                })
            }
            SendMode::Refuse { code, message } => Ok(SendInvoiceResult {
                success: false,
                invoice_id: String::new(),
                uuid: String::new(),
                error_message: Some(message.clone()),
                error_code: Some(code.clone()),
                raw: serde_json::json!({ "success": "false", "errorCode": code }),
            }),
            SendMode::Fail(err) => Err(err),
        }
    }

    async fn check_invoice_status(
        &self,
        uuid: Uuid,
    ) -> Result<InvoiceStatusReport, TransportError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let raw = self.remote_status.lock().unwrap().clone()?;
        Ok(InvoiceStatusReport {
            uuid: uuid.to_string(),
            status: map_gib_status(&raw),
            gib_status: Some(raw),
            status_date: Utc::now(),
            error_message: None,
            error_code: None,
        })
    }

    async fn get_incoming_invoices(&self) -> Result<Vec<IncomingInvoice>, TransportError> {
        self.incoming.lock().unwrap().clone()
    }

    async fn send_invoice_response(
        &self,
        _uuid: Uuid,
        _decision: ResponseDecision,
        _reason: Option<&str>,
    ) -> Result<bool, TransportError> {
        self.response_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response_accepted.load(Ordering::SeqCst))
    }

    async fn cancel_invoice(&self, _uuid: Uuid, _reason: &str) -> Result<bool, TransportError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.cancel_accepted.load(Ordering::SeqCst))
    }

    async fn get_invoice_report(
        &self,
        _uuid: Uuid,
        _format: ReportFormat,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.report.lock().unwrap().clone())
    }

    async fn test_connection(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

pub fn company() -> CompanyIdentity {
    CompanyIdentity::new("Vinç Kiralama A.Ş.", "9876543210", "İstanbul")
}

/// Invoice with two lines: 2 × 100.00 and 1 × 50.00.
pub fn invoice(id: i64) -> InvoiceGraph {
    InvoiceBuilder::new(id)
        .number(format!("FTR-{id}"))
        .customer(
            CustomerBuilder::new(100 + id, format!("Müşteri {id}"))
                .tax_number("1234567890")
                .build(),
        )
        .order_id(1000 + id)
        .add_item(OrderItemBuilder::new(1, "Mobil vinç 50t", 2, dec!(100.00)).build())
        .add_item(OrderItemBuilder::new(2, "Operatör", 1, dec!(50.00)).build())
        .build()
        .unwrap()
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub service: Arc<EInvoiceService>,
}

impl Harness {
    pub async fn with_invoices(ids: &[i64]) -> Self {
        let store = Arc::new(MemoryStore::new());
        for &id in ids {
            store.insert_invoice(invoice(id)).await;
        }
        let gateway = Arc::new(FakeGateway::default());
        let service = Arc::new(EInvoiceService::new(
            store.clone(),
            store.clone(),
            gateway.clone(),
            company(),
        ));
        Self {
            store,
            gateway,
            service,
        }
    }

    pub async fn record(&self, invoice_id: i64) -> Option<EInvoiceRecord> {
        use efatura::store::EInvoiceStore;
        self.store.find_by_invoice_id(invoice_id).await.unwrap()
    }
}
