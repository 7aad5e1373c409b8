#![no_main]

use efatura::core::*;
use libfuzzer_sys::fuzz_target;
use rust_decimal::Decimal;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let mut fields = s.splitn(4, '\u{1f}');
    let name = fields.next().unwrap_or_default();
    let tax_number = fields.next().unwrap_or_default();
    let equipment = fields.next().unwrap_or_default();
    let notes = fields.next();

    let mut customer = CustomerBuilder::new(1, name);
    if !tax_number.is_empty() {
        customer = customer.tax_number(tax_number);
    }
    let mut builder = InvoiceBuilder::new(1)
        .customer(customer.build())
        .add_item(OrderItemBuilder::new(1, equipment, 3, Decimal::new(12_345, 2)).build());
    if let Some(notes) = notes {
        builder = builder.order_notes(notes);
    }
    let Ok(graph) = builder.build() else {
        return;
    };
    let company = CompanyIdentity::new("Vinç Kiralama A.Ş.", "9876543210", "İstanbul");

    // Arbitrary text must always produce well-formed output.
    if let Ok(doc) = efatura::ubl::build_document(&graph, &company, uuid::Uuid::nil()) {
        assert_eq!(doc.xml_hash, efatura::ubl::content_hash(&doc.xml));
        assert!(doc.xml.trim_end().ends_with("</Invoice>"));
    }
});
