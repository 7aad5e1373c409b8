//! Parsing of gateway responses.
//!
//! Responses are read into a small element tree keyed by local name, so the
//! namespace prefixes a particular gateway build chooses (`soap:`, `s:`,
//! `env:` or none) do not matter.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::{Map, Value};

use super::envelope::Operation;
use super::{IncomingInvoice, InvoiceStatusReport, SendInvoiceResult};
use crate::core::{TransportError, map_gib_status};

/// One parsed XML element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Local name, prefix stripped.
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of a child, `None` if absent or blank.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    fn child_flag(&self, name: &str) -> bool {
        self.child_text(name)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// JSON view: leaves become strings, repeated names become arrays.
    pub fn to_json(&self) -> Value {
        if self.children.is_empty() {
            return Value::String(self.text.trim().to_string());
        }
        let mut map = Map::new();
        for child in &self.children {
            let value = child.to_json();
            match map.get_mut(&child.name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(child.name.clone(), value);
                }
            }
        }
        Value::Object(map)
    }
}

fn local_name(qname: &[u8]) -> String {
    let name = String::from_utf8_lossy(qname);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.into_owned(),
    }
}

fn malformed(msg: impl Into<String>) -> TransportError {
    TransportError::MalformedResponse(msg.into())
}

/// Parse a document into its root element.
pub fn parse_tree(xml: &str) -> Result<Element, TransportError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(Element {
                name: local_name(e.name().as_ref()),
                ..Default::default()
            }),
            Ok(Event::Empty(ref e)) => {
                let element = Element {
                    name: local_name(e.name().as_ref()),
                    ..Default::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| malformed(format!("bad text: {err}")))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                let bytes = e.into_inner();
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&bytes));
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced end tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(format!("XML parse error: {e}"))),
        }
    }

    if !stack.is_empty() {
        return Err(malformed("unexpected end of document"));
    }
    root.ok_or_else(|| malformed("empty response body"))
}

/// The SOAP body, or a `Fault` error if the body is a fault.
pub fn soap_body(root: &Element) -> Result<&Element, TransportError> {
    if root.name != "Envelope" {
        return Err(malformed(format!("expected Envelope, found {}", root.name)));
    }
    let body = root
        .child("Body")
        .ok_or_else(|| malformed("Envelope has no Body"))?;
    if let Some(fault) = body.child("Fault") {
        return Err(TransportError::Fault {
            code: fault.child_text("faultcode").unwrap_or_default(),
            message: fault
                .child_text("faultstring")
                .unwrap_or_else(|| "unspecified fault".into()),
        });
    }
    Ok(body)
}

/// `Envelope/Body/{Op}Response/{Op}Result`.
pub fn operation_result(root: &Element, op: Operation) -> Result<&Element, TransportError> {
    let response_name = format!("{}Response", op.name());
    let result_name = format!("{}Result", op.name());
    soap_body(root)?
        .child(&response_name)
        .and_then(|r| r.child(&result_name))
        .ok_or_else(|| malformed(format!("missing {response_name}/{result_name}")))
}

/// Parse a status date, falling back to now.
pub fn parse_status_date(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Utc::now();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return naive.and_utc();
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or_else(Utc::now)
}

pub fn parse_send_result(xml: &str) -> Result<SendInvoiceResult, TransportError> {
    let root = parse_tree(xml)?;
    let result = operation_result(&root, Operation::SendInvoice)?;
    Ok(SendInvoiceResult {
        success: result.child_flag("success"),
        invoice_id: result.child_text("invoiceId").unwrap_or_default(),
        uuid: result.child_text("uuid").unwrap_or_default(),
        error_message: result.child_text("errorMessage"),
        error_code: result.child_text("errorCode"),
        raw: result.to_json(),
    })
}

pub fn parse_status_result(xml: &str) -> Result<InvoiceStatusReport, TransportError> {
    let root = parse_tree(xml)?;
    let result = operation_result(&root, Operation::CheckInvoiceStatus)?;
    let gib_status = result.child_text("status");
    Ok(InvoiceStatusReport {
        uuid: result.child_text("uuid").unwrap_or_default(),
        status: map_gib_status(gib_status.as_deref().unwrap_or_default()),
        gib_status,
        status_date: parse_status_date(result.child_text("statusDate").as_deref()),
        error_message: result.child_text("errorMessage"),
        error_code: result.child_text("errorCode"),
    })
}

fn incoming_entry(element: &Element) -> Option<IncomingInvoice> {
    let uuid = element.child_text("uuid")?;
    let content = element
        .child_text("content")
        .and_then(|b64| STANDARD.decode(b64.as_bytes()).ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
    Some(IncomingInvoice {
        uuid,
        invoice_number: element.child_text("invoiceNumber"),
        sender_tax_number: element
            .child_text("senderVkn")
            .or_else(|| element.child_text("senderTaxNumber")),
        sender_name: element.child_text("senderName"),
        issue_date: element.child_text("issueDate"),
        payable_amount: element.child_text("payableAmount"),
        content,
    })
}

/// Every `invoices` element is one entry, whether the gateway sent one or
/// many. An `invoices` wrapper holding `invoice` children is unrolled.
pub fn parse_incoming_result(xml: &str) -> Result<Vec<IncomingInvoice>, TransportError> {
    let root = parse_tree(xml)?;
    let result = operation_result(&root, Operation::GetIncomingInvoices)?;

    let mut entries = Vec::new();
    for invoices in result.children_named("invoices") {
        let wrapped: Vec<&Element> = invoices.children_named("invoice").collect();
        if wrapped.is_empty() {
            entries.extend(incoming_entry(invoices));
        } else {
            entries.extend(wrapped.into_iter().filter_map(incoming_entry));
        }
    }
    Ok(entries)
}

/// `success` flag of a response or cancel acknowledgement.
pub fn parse_ack_result(xml: &str, op: Operation) -> Result<bool, TransportError> {
    let root = parse_tree(xml)?;
    Ok(operation_result(&root, op)?.child_flag("success"))
}

pub fn parse_report_result(xml: &str) -> Result<Option<Vec<u8>>, TransportError> {
    let root = parse_tree(xml)?;
    let result = operation_result(&root, Operation::GetInvoiceReport)?;
    let Some(content) = result.child_text("reportContent") else {
        return Ok(None);
    };
    let compact: String = content.split_whitespace().collect();
    STANDARD
        .decode(compact.as_bytes())
        .map(Some)
        .map_err(|e| malformed(format!("report is not valid base64: {e}")))
}
