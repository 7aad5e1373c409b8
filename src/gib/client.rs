use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Duration, SecondsFormat, Utc};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};
use uuid::Uuid;

use super::envelope::{self, Credentials, Operation};
use super::response;
use super::{
    GibGateway, IncomingInvoice, InvoiceStatusReport, ReportFormat, ResponseDecision,
    SendInvoiceResult,
};
use crate::core::{EFaturaError, GibConfig, TransportError};

/// Rolling window queried by `GetIncomingInvoices`.
const INCOMING_WINDOW_DAYS: i64 = 7;

/// Longest error body kept in `TransportError::Http`.
const MAX_ERROR_BODY: usize = 2048;

fn network(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Network(format!("request timed out: {e}"))
    } else {
        TransportError::Network(e.to_string())
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

/// SOAP client for one gateway account.
///
/// ```no_run
/// use efatura::core::{GibConfig, GibEnvironment};
/// use efatura::gib::{GibClient, GibGateway};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GibConfig::new(GibEnvironment::Test, "user", "secret", "9876543210");
/// let client = GibClient::new(config)?;
/// let incoming = client.get_incoming_invoices().await?;
/// println!("{} incoming invoices", incoming.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GibClient {
    http: reqwest::Client,
    config: GibConfig,
}

impl GibClient {
    pub fn new(config: GibConfig) -> Result<Self, EFaturaError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EFaturaError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GibConfig {
        &self.config
    }

    fn credentials(&self) -> Credentials<'_> {
        Credentials {
            vkn: &self.config.company_tax_number,
            username: &self.config.username,
            password: &self.config.password,
        }
    }

    /// Post the envelope for `op` and return the body of a 2xx answer.
    async fn call(
        &self,
        op: Operation,
        fields: &[(&str, Option<&str>)],
    ) -> Result<String, TransportError> {
        let body = envelope::build(op, &self.credentials(), fields)?;
        let url = format!("{}{}", self.config.base_url(), op.path());
        debug!(operation = op.name(), %url, "calling GIB gateway");

        let resp = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", op.soap_action())
            .body(body)
            .send()
            .await
            .map_err(network)?;

        let status = resp.status();
        let text = resp.text().await.map_err(network)?;

        if !status.is_success() {
            // SOAP 1.1 reports faults with HTTP 500.
            if let Ok(root) = response::parse_tree(&text) {
                if let Err(fault @ TransportError::Fault { .. }) = response::soap_body(&root) {
                    warn!(operation = op.name(), error = %fault, "gateway fault");
                    return Err(fault);
                }
            }
            warn!(operation = op.name(), status = status.as_u16(), "gateway HTTP error");
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: truncate(text),
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl GibGateway for GibClient {
    async fn send_invoice(&self, xml: &str) -> Result<SendInvoiceResult, TransportError> {
        let content = STANDARD.encode(xml.as_bytes());
        let body = self
            .call(Operation::SendInvoice, &[("invoiceContent", Some(content.as_str()))])
            .await?;
        response::parse_send_result(&body)
    }

    async fn check_invoice_status(
        &self,
        uuid: Uuid,
    ) -> Result<InvoiceStatusReport, TransportError> {
        let uuid = uuid.to_string();
        let body = self
            .call(Operation::CheckInvoiceStatus, &[("uuid", Some(uuid.as_str()))])
            .await?;
        response::parse_status_result(&body)
    }

    async fn get_incoming_invoices(&self) -> Result<Vec<IncomingInvoice>, TransportError> {
        let end = Utc::now();
        let start = end - Duration::days(INCOMING_WINDOW_DAYS);
        let start = start.to_rfc3339_opts(SecondsFormat::Millis, true);
        let end = end.to_rfc3339_opts(SecondsFormat::Millis, true);
        let body = self
            .call(
                Operation::GetIncomingInvoices,
                &[("startDate", Some(start.as_str())), ("endDate", Some(end.as_str()))],
            )
            .await?;
        response::parse_incoming_result(&body)
    }

    async fn send_invoice_response(
        &self,
        uuid: Uuid,
        decision: ResponseDecision,
        reason: Option<&str>,
    ) -> Result<bool, TransportError> {
        let uuid = uuid.to_string();
        let body = self
            .call(
                Operation::SendInvoiceResponse,
                &[
                    ("uuid", Some(uuid.as_str())),
                    ("status", Some(decision.as_str())),
                    ("reason", reason),
                ],
            )
            .await?;
        response::parse_ack_result(&body, Operation::SendInvoiceResponse)
    }

    async fn cancel_invoice(&self, uuid: Uuid, reason: &str) -> Result<bool, TransportError> {
        let uuid = uuid.to_string();
        let body = self
            .call(
                Operation::CancelInvoice,
                &[("uuid", Some(uuid.as_str())), ("reason", Some(reason))],
            )
            .await?;
        response::parse_ack_result(&body, Operation::CancelInvoice)
    }

    async fn get_invoice_report(
        &self,
        uuid: Uuid,
        format: ReportFormat,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let uuid = uuid.to_string();
        let body = self
            .call(
                Operation::GetInvoiceReport,
                &[("uuid", Some(uuid.as_str())), ("format", Some(format.as_str()))],
            )
            .await?;
        response::parse_report_result(&body)
    }

    async fn test_connection(&self) -> bool {
        let url = format!("{}/EFatura?wsdl", self.config.base_url());
        match self.http.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(%url, error = %e, "gateway connection test failed");
                false
            }
        }
    }
}
