//! Send one invoice to the GIB test gateway and print what happened.
//!
//! ```sh
//! GIB_USERNAME=... GIB_PASSWORD=... cargo run --example send_invoice
//! ```
//!
//! `GIB_BASE_URL` points the client at a different gateway, e.g. a local mock.

use std::env;
use std::sync::Arc;

use efatura::core::*;
use efatura::gib::GibClient;
use efatura::service::{EInvoiceService, SendOutcome};
use efatura::store::MemoryStore;
use rust_decimal_macros::dec;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let username = env::var("GIB_USERNAME").unwrap_or_else(|_| "test-user".into());
    let password = env::var("GIB_PASSWORD").unwrap_or_else(|_| "test-pass".into());

    let mut gib = GibConfig::new(GibEnvironment::Test, username, password, "9876543210")
        .with_timeout(30);
    if let Ok(url) = env::var("GIB_BASE_URL") {
        gib = gib.with_base_url(url);
    }
    let company = CompanyIdentity::new("Vinç Kiralama A.Ş.", "9876543210", "İstanbul");

    // An invoice as the order system would hand it over
    let graph = InvoiceBuilder::new(1)
        .number("FTR-2024-0001")
        .customer(
            CustomerBuilder::new(7, "Yapı İnşaat Ltd. Şti.")
                .tax_number("1234567890")
                .build(),
        )
        .order_id(1001)
        .add_item(OrderItemBuilder::new(1, "Mobil vinç 50t", 2, dec!(1500)).build())
        .add_item(OrderItemBuilder::new(2, "Operatör", 2, dec!(250)).build())
        .build()?;

    let problems = validate_for_submission(&graph, &company);
    if !problems.is_empty() {
        eprintln!("Invoice is not ready for submission:");
        for problem in problems {
            eprintln!("  - {problem}");
        }
        return Ok(());
    }

    let store = Arc::new(MemoryStore::new());
    store.insert_invoice(graph).await;
    let gateway = Arc::new(GibClient::new(gib)?);
    let service = EInvoiceService::new(store.clone(), store, gateway, company);

    match service.send_e_invoice(1).await {
        SendOutcome::Sent {
            uuid,
            gib_invoice_id,
            ..
        } => println!("Sent: uuid={uuid} gib_id={gib_invoice_id}"),
        SendOutcome::AlreadySent { status, .. } => println!("Already sent ({status})"),
        SendOutcome::Failed {
            error_message,
            error_code,
            ..
        } => println!(
            "Failed: {error_message} (code {})",
            error_code.as_deref().unwrap_or("-")
        ),
    }

    Ok(())
}
