//! # efatura
//!
//! Turkish e-Invoice (e-Fatura) clearance: UBL-TR document generation,
//! the GIB gateway protocol, and reconciliation of the local record with
//! what the gateway reports.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! A record moves through the [`EInvoiceStatus`] state machine
//! (`PENDING → SENT → RECEIVED → APPROVED`, with `REJECTED` and
//! `CANCELLED` branches) and is only ever written along legal edges.
//!
//! ## Quick Start
//!
//! ```rust
//! use efatura::core::*;
//! use rust_decimal_macros::dec;
//!
//! let graph = InvoiceBuilder::new(1)
//!     .number("FTR-2024-0001")
//!     .customer(CustomerBuilder::new(7, "Yapı Ltd").tax_number("1234567890").build())
//!     .add_item(OrderItemBuilder::new(1, "Mobil vinç 50t", 2, dec!(1500)).build())
//!     .build()
//!     .unwrap();
//!
//! let company = CompanyIdentity::new("Vinç Kiralama A.Ş.", "9876543210", "İstanbul");
//! assert!(validate_for_submission(&graph, &company).is_empty());
//! assert_eq!(graph.invoice.vat_amount, dec!(600.00));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Domain types, status state machine, validation, store traits |
//! | `ubl` | UBL-TR XML generation and content hashing |
//! | `gib` | GIB SOAP client, integration service, batch and polling helpers |
//! | `server` | axum HTTP surface, configuration loading, logging setup |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "core")]
pub mod store;

#[cfg(feature = "ubl")]
pub mod ubl;

#[cfg(feature = "gib")]
pub mod gib;

#[cfg(feature = "gib")]
pub mod service;

#[cfg(feature = "server")]
pub mod http;

#[cfg(feature = "server")]
pub mod settings;

#[cfg(feature = "server")]
pub mod telemetry;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
