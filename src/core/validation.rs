use rust_decimal::Decimal;

use super::config::CompanyIdentity;
use super::error::ValidationError;
use super::types::*;

/// Validate an invoice graph before it is submitted for clearance.
/// Returns all validation errors found (not just the first).
pub fn validate_for_submission(
    graph: &InvoiceGraph,
    company: &CompanyIdentity,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if company.name.trim().is_empty() {
        errors.push(ValidationError::with_rule(
            "company.name",
            "supplier name must not be empty",
            "TR-SUPPLIER",
        ));
    }
    if !is_valid_vkn(&company.tax_number) && !is_valid_tckn(&company.tax_number) {
        errors.push(ValidationError::with_rule(
            "company.tax_number",
            format!(
                "supplier tax number '{}' is neither a 10-digit VKN nor a valid TCKN",
                company.tax_number
            ),
            "TR-VKN",
        ));
    }

    if graph.customer.display_name().trim().is_empty() {
        errors.push(ValidationError::with_rule(
            "customer.name",
            "customer name must not be empty",
            "TR-CUSTOMER",
        ));
    }
    if let Some(tax_number) = graph.customer.tax_number() {
        validate_tax_number(tax_number, "customer.tax_number", &mut errors);
    }

    let invoice = &graph.invoice;
    if invoice.order_id.is_some_and(|id| id != graph.order.id) {
        errors.push(ValidationError::new(
            "invoice.order_id",
            "loaded order does not belong to this invoice",
        ));
    }

    for (field, amount) in [
        ("invoice.total_amount", invoice.total_amount),
        ("invoice.vat_amount", invoice.vat_amount),
        ("invoice.grand_total", invoice.grand_total),
        ("invoice.paid_amount", invoice.paid_amount),
    ] {
        if amount < Decimal::ZERO {
            errors.push(ValidationError::with_rule(
                field,
                "amount must not be negative",
                "TR-AMOUNT",
            ));
        }
    }
    if invoice.paid_amount > invoice.grand_total {
        errors.push(ValidationError::with_rule(
            "invoice.paid_amount",
            "paid amount exceeds grand total",
            "TR-AMOUNT",
        ));
    }

    if graph.order.items.is_empty() {
        errors.push(ValidationError::with_rule(
            "order.items",
            "invoice must have at least one line",
            "TR-LINES",
        ));
    }
    for (i, item) in graph.order.items.iter().enumerate() {
        if item.quantity == 0 {
            errors.push(ValidationError::with_rule(
                format!("order.items[{i}].quantity"),
                "quantity must be positive",
                "TR-LINES",
            ));
        }
        if item.unit_price < Decimal::ZERO {
            errors.push(ValidationError::with_rule(
                format!("order.items[{i}].unit_price"),
                "unit price must not be negative",
                "TR-LINES",
            ));
        }
        if item.total_amount.is_some_and(|t| t < Decimal::ZERO) {
            errors.push(ValidationError::with_rule(
                format!("order.items[{i}].total_amount"),
                "line total must not be negative",
                "TR-LINES",
            ));
        }
    }

    errors
}

fn validate_tax_number(value: &str, field: &str, errors: &mut Vec<ValidationError>) {
    match value.len() {
        10 if is_valid_vkn(value) => {}
        11 if is_valid_tckn(value) => {}
        11 if value.bytes().all(|b| b.is_ascii_digit()) => {
            errors.push(ValidationError::with_rule(
                field,
                format!("'{value}' fails the TCKN checksum"),
                "TR-TCKN",
            ));
        }
        _ => errors.push(ValidationError::with_rule(
            field,
            format!("'{value}' must be a 10-digit VKN or an 11-digit TCKN"),
            "TR-VKN",
        )),
    }
}

/// Vergi Kimlik Numarası: exactly 10 digits.
pub fn is_valid_vkn(value: &str) -> bool {
    value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit())
}

/// T.C. Kimlik Numarası: 11 digits, first non-zero, two check digits.
pub fn is_valid_tckn(value: &str) -> bool {
    if value.len() != 11 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let d: Vec<u32> = value.bytes().map(|b| u32::from(b - b'0')).collect();
    if d[0] == 0 {
        return false;
    }

    let odd = d[0] + d[2] + d[4] + d[6] + d[8];
    let even = d[1] + d[3] + d[5] + d[7];
    // odd * 7 >= 0 and even <= 36, so add a multiple of 10 before subtracting.
    let tenth = (odd * 7 + 40 - even) % 10;
    let eleventh = d[..10].iter().sum::<u32>() % 10;

    d[9] == tenth && d[10] == eleventh
}
