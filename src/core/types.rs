use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::EInvoiceStatus;

/// KDV rate applied to every rental line, in percent.
pub const STANDARD_VAT_RATE: Decimal = rust_decimal_macros::dec!(20);

/// Invoice as owned by the billing side of the ERP.
///
/// Read-only for the clearance workflow, except for the final
/// `Cancelled` stamp written after a successful cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    /// Human-facing invoice number; `INV-{id}` is used when absent.
    pub invoice_number: Option<String>,
    /// Issue timestamp. "Now" is used when absent.
    pub invoice_date: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub kind: InvoiceKind,
    pub status: InvoiceState,
    /// Net total (before VAT) as invoiced.
    pub total_amount: Decimal,
    /// VAT total as invoiced.
    pub vat_amount: Decimal,
    /// Gross total as invoiced.
    pub grand_total: Decimal,
    /// Amount already collected against this invoice.
    pub paid_amount: Decimal,
    /// Free-text payment method label (e.g. "Nakit", "Kredi Kartı").
    pub payment_method: Option<String>,
    pub customer_id: i64,
    pub order_id: Option<i64>,
}

impl Invoice {
    /// Document number written into `cbc:ID`.
    pub fn document_number(&self) -> String {
        self.invoice_number
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("INV-{}", self.id))
    }
}

/// Sales or return invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceKind {
    Sales,
    Return,
}

impl InvoiceKind {
    /// UBL-TR `InvoiceTypeCode` value.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sales => "SATIS",
            Self::Return => "IADE",
        }
    }
}

/// Billing status of the underlying invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceState {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// VKN (10 digits, companies) or TCKN (11 digits, individuals).
    pub tax_number: Option<String>,
    pub tax_office: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

impl Customer {
    /// Name printed on the document.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.name)
    }

    pub fn tax_number(&self) -> Option<&str> {
        self.tax_number
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
}

/// Rental order line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub equipment: Option<Equipment>,
    pub quantity: u32,
    /// Unit (daily) rate.
    pub unit_price: Decimal,
    /// Stored line total; `quantity * unit_price` when absent.
    pub total_amount: Option<Decimal>,
}

impl OrderItem {
    /// Line extension amount (net, before VAT).
    pub fn line_amount(&self) -> Decimal {
        self.total_amount
            .unwrap_or_else(|| self.unit_price * Decimal::from(self.quantity))
    }

    pub fn description(&self) -> &str {
        self.equipment
            .as_ref()
            .map(|e| e.name.as_str())
            .unwrap_or("Hizmet Bedeli")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: i64,
    pub name: String,
}

/// Fully loaded invoice with its customer and order lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceGraph {
    pub invoice: Invoice,
    pub customer: Customer,
    pub order: Order,
}

/// UNTDID 4461 payment means codes used on Turkish invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMeansCode {
    /// 10: Cash.
    Cash,
    /// 20: Cheque.
    Cheque,
    /// 21: Bill of exchange (senet).
    BillOfExchange,
    /// 30: Credit transfer.
    CreditTransfer,
    /// 42: Payment to bank account.
    PaymentToBankAccount,
    /// 48: Bank card.
    BankCard,
}

impl PaymentMeansCode {
    pub fn code(&self) -> u16 {
        match self {
            Self::Cash => 10,
            Self::Cheque => 20,
            Self::BillOfExchange => 21,
            Self::CreditTransfer => 30,
            Self::PaymentToBankAccount => 42,
            Self::BankCard => 48,
        }
    }

    /// Derive from the ERP's payment method label. Unknown → credit transfer.
    pub fn from_method_label(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::CreditTransfer;
        };
        match label.trim() {
            "Nakit" | "Cash" => Self::Cash,
            "Çek" | "Cheque" => Self::Cheque,
            "Senet" => Self::BillOfExchange,
            "Banka Transferi" | "Bank Transfer" => Self::PaymentToBankAccount,
            "Kredi Kartı" | "Credit Card" => Self::BankCard,
            _ => Self::CreditTransfer,
        }
    }
}

/// Which side of the exchange a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordDirection {
    /// Our own invoice, submitted for clearance.
    Outgoing,
    /// Addressed to us by another party.
    Incoming,
}

/// Persisted clearance state of one invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EInvoiceRecord {
    pub id: i64,
    /// Owning invoice. `None` for incoming records.
    pub invoice_id: Option<i64>,
    pub direction: RecordDirection,
    /// ETTN, the correlation key with the gateway.
    pub uuid: Uuid,
    pub status: EInvoiceStatus,
    /// Last raw status string reported by the gateway.
    pub gib_status: Option<String>,
    pub xml_content: Option<String>,
    /// Hex SHA-256 of `xml_content`.
    pub xml_hash: Option<String>,
    /// Last transport payload, for diagnostics.
    pub gib_response: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    /// Issuer tax number of an incoming invoice.
    pub sender_tax_number: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EInvoiceRecord {
    /// True once the gateway has accepted the document at least once.
    pub fn was_transmitted(&self) -> bool {
        self.sent_at.is_some()
    }

    /// Whether a regenerated document would transmit identical content.
    pub fn content_matches(&self, xml_hash: &str) -> bool {
        self.xml_hash.as_deref() == Some(xml_hash)
    }
}

/// Field set written by `create`, `upsert` and `stage_for_send`.
#[derive(Debug, Clone)]
pub struct NewEInvoice {
    pub invoice_id: Option<i64>,
    pub direction: RecordDirection,
    pub uuid: Uuid,
    pub status: EInvoiceStatus,
    pub gib_status: Option<String>,
    pub xml_content: Option<String>,
    pub xml_hash: Option<String>,
    pub gib_response: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    pub sender_tax_number: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
}

impl NewEInvoice {
    /// Fresh outgoing record for `invoice_id`.
    pub fn outgoing(invoice_id: i64, uuid: Uuid, status: EInvoiceStatus) -> Self {
        Self {
            invoice_id: Some(invoice_id),
            direction: RecordDirection::Outgoing,
            uuid,
            status,
            gib_status: None,
            xml_content: None,
            xml_hash: None,
            gib_response: None,
            error_message: None,
            error_code: None,
            sender_tax_number: None,
            sent_at: None,
            received_at: None,
        }
    }

    /// Record for an invoice found in our incoming mailbox.
    pub fn incoming(uuid: Uuid, received_at: DateTime<Utc>) -> Self {
        Self {
            invoice_id: None,
            direction: RecordDirection::Incoming,
            received_at: Some(received_at),
            ..Self::outgoing(0, uuid, EInvoiceStatus::Received)
        }
    }

    pub fn with_document(mut self, xml: impl Into<String>, hash: impl Into<String>) -> Self {
        self.xml_content = Some(xml.into());
        self.xml_hash = Some(hash.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>, code: Option<String>) -> Self {
        self.error_message = Some(message.into());
        self.error_code = code;
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error_message = None;
        self.error_code = None;
        self
    }
}

impl From<&EInvoiceRecord> for NewEInvoice {
    fn from(r: &EInvoiceRecord) -> Self {
        Self {
            invoice_id: r.invoice_id,
            direction: r.direction,
            uuid: r.uuid,
            status: r.status,
            gib_status: r.gib_status.clone(),
            xml_content: r.xml_content.clone(),
            xml_hash: r.xml_hash.clone(),
            gib_response: r.gib_response.clone(),
            error_message: r.error_message.clone(),
            error_code: r.error_code.clone(),
            sender_tax_number: r.sender_tax_number.clone(),
            sent_at: r.sent_at,
            received_at: r.received_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn line_amount_prefers_stored_total() {
        let item = OrderItem {
            id: 1,
            equipment: None,
            quantity: 3,
            unit_price: dec!(100),
            total_amount: Some(dec!(250)),
        };
        assert_eq!(item.line_amount(), dec!(250));
    }

    #[test]
    fn line_amount_falls_back_to_quantity_times_price() {
        let item = OrderItem {
            id: 1,
            equipment: None,
            quantity: 3,
            unit_price: dec!(12.50),
            total_amount: None,
        };
        assert_eq!(item.line_amount(), dec!(37.50));
        assert_eq!(item.description(), "Hizmet Bedeli");
    }

    #[test]
    fn payment_means_from_labels() {
        assert_eq!(PaymentMeansCode::from_method_label(Some("Nakit")).code(), 10);
        assert_eq!(PaymentMeansCode::from_method_label(Some("Kredi Kartı")).code(), 48);
        assert_eq!(PaymentMeansCode::from_method_label(Some("Senet")).code(), 21);
        assert_eq!(PaymentMeansCode::from_method_label(Some("Barter")).code(), 30);
        assert_eq!(PaymentMeansCode::from_method_label(None).code(), 30);
    }

    #[test]
    fn incoming_record_has_no_invoice() {
        let uuid = Uuid::new_v4();
        let rec = NewEInvoice::incoming(uuid, Utc::now());
        assert_eq!(rec.invoice_id, None);
        assert_eq!(rec.direction, RecordDirection::Incoming);
        assert_eq!(rec.status, EInvoiceStatus::Received);
    }
}
