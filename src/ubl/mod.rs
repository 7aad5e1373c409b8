//! UBL-TR 1.2 e-Invoice document generation.
//!
//! Turns a fully loaded [`InvoiceGraph`](crate::core::InvoiceGraph) into the
//! UBL 2.1 `Invoice` document the clearance gateway expects, together with a
//! SHA-256 content hash.
//!
//! # Example
//!
//! ```
//! use efatura::core::*;
//! use efatura::ubl;
//! use rust_decimal_macros::dec;
//! use uuid::Uuid;
//!
//! let graph = InvoiceBuilder::new(42)
//!     .customer(CustomerBuilder::new(7, "Kadraj Film").tax_number("1234567890").build())
//!     .add_item(OrderItemBuilder::new(1, "Sony FX6", 2, dec!(100)).build())
//!     .build()
//!     .unwrap();
//! let company = CompanyIdentity::new("Kamera Kiralama A.Ş.", "9876543210", "İstanbul");
//!
//! let doc = ubl::build_document(&graph, &company, Uuid::new_v4()).unwrap();
//! assert!(doc.xml.starts_with("<?xml"));
//! assert_eq!(doc.xml_hash.len(), 64);
//! ```

mod document;
pub(crate) mod xml_utils;

pub use document::{TaxSubtotal, UblDocument, build_document, content_hash, tax_subtotals};
pub use xml_utils::{format_amount, format_percent};

/// UBL schema version (`cbc:UBLVersionID`).
pub const UBL_VERSION_ID: &str = "2.1";

/// UBL-TR customization (`cbc:CustomizationID`).
pub const UBL_TR_CUSTOMIZATION_ID: &str = "TR1.2";

/// Profile for invoices between two registered e-Invoice users.
pub const PROFILE_TICARI: &str = "TICARIFATURA";

/// Profile for invoices to parties outside the e-Invoice system.
pub const PROFILE_EARSIV: &str = "EARSIVFATURA";

/// Document currency; every amount carries it as `currencyID`.
pub const CURRENCY_CODE: &str = "TRY";

/// UN/ECE rec. 20 "one" (piece), used for rental lines.
pub const UNIT_CODE: &str = "C62";

/// Tax type code of KDV (VAT) in the GIB code lists.
pub const KDV_TAX_TYPE_CODE: &str = "0015";

/// UBL 2.1 namespace URIs.
pub mod ubl_ns {
    pub const INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
    pub const CAC: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
    pub const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
}
