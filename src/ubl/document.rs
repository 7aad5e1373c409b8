use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::xml_utils::{XmlWriter, format_percent, round_amount};
use super::*;
use crate::core::*;

/// A generated UBL-TR document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UblDocument {
    /// ETTN written into `cbc:UUID`.
    pub uuid: Uuid,
    pub xml: String,
    /// Hex-encoded SHA-256 of `xml`.
    pub xml_hash: String,
}

/// One `cac:TaxSubtotal` bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxSubtotal {
    pub rate: Decimal,
    pub taxable_amount: Decimal,
    pub tax_amount: Decimal,
}

/// Hex-encoded SHA-256 of a document.
pub fn content_hash(xml: &str) -> String {
    hex::encode(Sha256::digest(xml.as_bytes()))
}

fn line_rate(_item: &OrderItem) -> Decimal {
    STANDARD_VAT_RATE
}

fn tax_of(amount: Decimal, rate: Decimal) -> Decimal {
    round_amount(amount * rate / Decimal::ONE_HUNDRED)
}

/// Group lines by VAT rate. The tax of each bucket is computed on the bucket
/// sum, not accumulated from rounded line taxes.
pub fn tax_subtotals(items: &[OrderItem]) -> Vec<TaxSubtotal> {
    let mut buckets: BTreeMap<Decimal, Decimal> = BTreeMap::new();
    for item in items {
        *buckets.entry(line_rate(item)).or_default() += item.line_amount();
    }
    buckets
        .into_iter()
        .map(|(rate, taxable)| TaxSubtotal {
            rate,
            taxable_amount: round_amount(taxable),
            tax_amount: tax_of(taxable, rate),
        })
        .collect()
}

/// Generate the UBL-TR `Invoice` document for `graph`.
///
/// Header totals come from the stored invoice amounts, not from the lines,
/// so the document states exactly what was invoiced.
pub fn build_document(
    graph: &InvoiceGraph,
    company: &CompanyIdentity,
    uuid: Uuid,
) -> Result<UblDocument, EFaturaError> {
    let invoice = &graph.invoice;
    let customer = &graph.customer;
    let items = &graph.order.items;
    let currency = CURRENCY_CODE;
    let issued = invoice.invoice_date.unwrap_or_else(Utc::now);

    let mut w = XmlWriter::new()?;
    w.start_element_with_attrs(
        "Invoice",
        &[
            ("xmlns", ubl_ns::INVOICE),
            ("xmlns:cac", ubl_ns::CAC),
            ("xmlns:cbc", ubl_ns::CBC),
        ],
    )?;

    w.text_element("cbc:UBLVersionID", UBL_VERSION_ID)?;
    w.text_element("cbc:CustomizationID", UBL_TR_CUSTOMIZATION_ID)?;
    let profile = if customer.tax_number().is_some() {
        PROFILE_TICARI
    } else {
        PROFILE_EARSIV
    };
    w.text_element("cbc:ProfileID", profile)?;
    w.text_element("cbc:ID", &invoice.document_number())?;
    w.text_element("cbc:CopyIndicator", "false")?;
    w.text_element("cbc:UUID", &uuid.to_string())?;
    w.text_element("cbc:IssueDate", &issued.format("%Y-%m-%d").to_string())?;
    w.text_element("cbc:IssueTime", &issued.format("%H:%M:%S").to_string())?;
    w.text_element("cbc:InvoiceTypeCode", invoice.kind.code())?;
    w.optional_text_element("cbc:Note", graph.order.notes.as_deref())?;
    w.text_element("cbc:DocumentCurrencyCode", currency)?;
    w.text_element("cbc:LineCountNumeric", &items.len().to_string())?;

    write_supplier(&mut w, company)?;
    write_customer(&mut w, customer, company)?;

    w.start_element("cac:PaymentMeans")?;
    let means = PaymentMeansCode::from_method_label(invoice.payment_method.as_deref());
    w.text_element("cbc:PaymentMeansCode", &means.code().to_string())?;
    if let Some(due) = invoice.due_date {
        w.text_element("cbc:PaymentDueDate", &due.format("%Y-%m-%d").to_string())?;
    }
    w.end_element("cac:PaymentMeans")?;

    w.start_element("cac:TaxTotal")?;
    w.amount_element("cbc:TaxAmount", invoice.vat_amount, currency)?;
    for subtotal in tax_subtotals(items) {
        write_tax_subtotal(
            &mut w,
            subtotal.taxable_amount,
            subtotal.tax_amount,
            subtotal.rate,
        )?;
    }
    w.end_element("cac:TaxTotal")?;

    w.start_element("cac:LegalMonetaryTotal")?;
    w.amount_element("cbc:LineExtensionAmount", invoice.total_amount, currency)?;
    w.amount_element("cbc:TaxExclusiveAmount", invoice.total_amount, currency)?;
    w.amount_element("cbc:TaxInclusiveAmount", invoice.grand_total, currency)?;
    if invoice.paid_amount > Decimal::ZERO {
        w.amount_element("cbc:PrepaidAmount", invoice.paid_amount, currency)?;
    }
    w.amount_element(
        "cbc:PayableAmount",
        invoice.grand_total - invoice.paid_amount,
        currency,
    )?;
    w.end_element("cac:LegalMonetaryTotal")?;

    for (index, item) in items.iter().enumerate() {
        write_line(&mut w, index + 1, item)?;
    }

    w.end_element("Invoice")?;
    let xml = w.into_string()?;
    let xml_hash = content_hash(&xml);

    Ok(UblDocument {
        uuid,
        xml,
        xml_hash,
    })
}

fn tax_scheme_for(tax_number: &str) -> Option<&'static str> {
    if tax_number.bytes().all(|b| b.is_ascii_digit()) {
        match tax_number.len() {
            10 => Some("VKN"),
            11 => Some("TCKN"),
            _ => None,
        }
    } else {
        None
    }
}

fn write_party_identification(
    w: &mut XmlWriter,
    id: &str,
    scheme: Option<&str>,
) -> Result<(), EFaturaError> {
    w.start_element("cac:PartyIdentification")?;
    match scheme {
        Some(scheme) => w.text_element_with_attrs("cbc:ID", id, &[("schemeID", scheme)])?,
        None => w.text_element("cbc:ID", id)?,
    };
    w.end_element("cac:PartyIdentification")?;
    Ok(())
}

fn write_address(
    w: &mut XmlWriter,
    street: Option<&str>,
    city: &str,
    postal_zone: Option<&str>,
    country: &str,
) -> Result<(), EFaturaError> {
    w.start_element("cac:PostalAddress")?;
    w.optional_text_element("cbc:StreetName", street)?;
    w.text_element("cbc:CityName", city)?;
    w.optional_text_element("cbc:PostalZone", postal_zone)?;
    w.start_element("cac:Country")?;
    w.text_element("cbc:Name", country)?;
    w.end_element("cac:Country")?;
    w.end_element("cac:PostalAddress")?;
    Ok(())
}

fn write_tax_office(w: &mut XmlWriter, office: Option<&str>) -> Result<(), EFaturaError> {
    let Some(office) = office.map(str::trim).filter(|o| !o.is_empty()) else {
        return Ok(());
    };
    w.start_element("cac:PartyTaxScheme")?;
    w.start_element("cac:TaxScheme")?;
    w.text_element("cbc:Name", office)?;
    w.end_element("cac:TaxScheme")?;
    w.end_element("cac:PartyTaxScheme")?;
    Ok(())
}

fn write_contact(
    w: &mut XmlWriter,
    phone: Option<&str>,
    email: Option<&str>,
) -> Result<(), EFaturaError> {
    if phone.is_none() && email.is_none() {
        return Ok(());
    }
    w.start_element("cac:Contact")?;
    w.optional_text_element("cbc:Telephone", phone)?;
    w.optional_text_element("cbc:ElectronicMail", email)?;
    w.end_element("cac:Contact")?;
    Ok(())
}

fn write_supplier(w: &mut XmlWriter, company: &CompanyIdentity) -> Result<(), EFaturaError> {
    w.start_element("cac:AccountingSupplierParty")?;
    w.start_element("cac:Party")?;
    w.optional_text_element("cbc:WebsiteURI", company.website.as_deref())?;
    let tax_number = company.tax_number.trim();
    write_party_identification(w, tax_number, Some(tax_scheme_for(tax_number).unwrap_or("VKN")))?;
    w.start_element("cac:PartyName")?;
    w.text_element("cbc:Name", &company.name)?;
    w.end_element("cac:PartyName")?;
    write_address(
        w,
        company.street.as_deref(),
        &company.city,
        company.postal_zone.as_deref(),
        &company.country,
    )?;
    write_tax_office(w, company.tax_office.as_deref())?;
    write_contact(w, company.phone.as_deref(), company.email.as_deref())?;
    w.end_element("cac:Party")?;
    w.end_element("cac:AccountingSupplierParty")?;
    Ok(())
}

fn write_customer(
    w: &mut XmlWriter,
    customer: &Customer,
    company: &CompanyIdentity,
) -> Result<(), EFaturaError> {
    w.start_element("cac:AccountingCustomerParty")?;
    w.start_element("cac:Party")?;

    match customer.tax_number() {
        Some(tax_number) => write_party_identification(w, tax_number, tax_scheme_for(tax_number))?,
        None => {
            let fallback = customer
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("CUST-{}", customer.id));
            write_party_identification(w, &fallback, None)?;
        }
    }

    w.start_element("cac:PartyName")?;
    w.text_element("cbc:Name", customer.display_name())?;
    w.end_element("cac:PartyName")?;
    write_address(
        w,
        customer.address.as_deref(),
        customer.city.as_deref().unwrap_or(&company.city),
        None,
        &company.country,
    )?;
    write_tax_office(w, customer.tax_office.as_deref())?;
    write_contact(w, customer.phone.as_deref(), customer.email.as_deref())?;

    w.end_element("cac:Party")?;
    w.end_element("cac:AccountingCustomerParty")?;
    Ok(())
}

fn write_tax_subtotal(
    w: &mut XmlWriter,
    taxable: Decimal,
    tax: Decimal,
    rate: Decimal,
) -> Result<(), EFaturaError> {
    w.start_element("cac:TaxSubtotal")?;
    w.amount_element("cbc:TaxableAmount", taxable, CURRENCY_CODE)?;
    w.amount_element("cbc:TaxAmount", tax, CURRENCY_CODE)?;
    w.text_element("cbc:Percent", &format_percent(rate))?;
    w.start_element("cac:TaxCategory")?;
    w.start_element("cac:TaxScheme")?;
    w.text_element("cbc:Name", "KDV")?;
    w.text_element("cbc:TaxTypeCode", KDV_TAX_TYPE_CODE)?;
    w.end_element("cac:TaxScheme")?;
    w.end_element("cac:TaxCategory")?;
    w.end_element("cac:TaxSubtotal")?;
    Ok(())
}

fn write_line(w: &mut XmlWriter, id: usize, item: &OrderItem) -> Result<(), EFaturaError> {
    let net = item.line_amount();
    let rate = line_rate(item);
    let tax = tax_of(net, rate);

    w.start_element("cac:InvoiceLine")?;
    w.text_element("cbc:ID", &id.to_string())?;
    w.quantity_element("cbc:InvoicedQuantity", item.quantity, UNIT_CODE)?;
    w.amount_element("cbc:LineExtensionAmount", net, CURRENCY_CODE)?;

    w.start_element("cac:TaxTotal")?;
    w.amount_element("cbc:TaxAmount", tax, CURRENCY_CODE)?;
    write_tax_subtotal(w, net, tax, rate)?;
    w.end_element("cac:TaxTotal")?;

    w.start_element("cac:Item")?;
    w.text_element("cbc:Name", item.description())?;
    w.end_element("cac:Item")?;

    w.start_element("cac:Price")?;
    w.amount_element("cbc:PriceAmount", item.unit_price, CURRENCY_CODE)?;
    w.end_element("cac:Price")?;

    w.end_element("cac:InvoiceLine")?;
    Ok(())
}
