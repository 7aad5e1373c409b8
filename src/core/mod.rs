//! Core e-Invoice types, clearance state machine, and validation.
//!
//! This module provides the ERP-side invoice graph the document builder
//! consumes, the persisted [`EInvoiceRecord`] with its
//! [`EInvoiceStatus`] lifecycle, and pre-submission checks for Turkish
//! tax identifiers.

mod builder;
mod config;
mod error;
mod status;
mod types;
mod validation;

pub use builder::*;
pub use config::*;
pub use error::*;
pub use status::*;
pub use types::*;
pub use validation::*;
