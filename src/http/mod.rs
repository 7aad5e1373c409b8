//! JSON-over-HTTP surface of the clearance workflow.
//!
//! Handlers only parse input and map results onto status codes; every
//! decision is made by [`EInvoiceService`].

mod dto;
mod error;
mod handlers;

pub use dto::{ApiResponse, ListQuery, parse_date};
pub use error::{ApiError, ErrorResponse};

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::service::EInvoiceService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EInvoiceService>,
}

impl AppState {
    pub fn new(service: Arc<EInvoiceService>) -> Self {
        Self { service }
    }
}

/// Routes, relative to wherever the caller nests them.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/invoices", get(handlers::list_records))
        .route("/invoices/incoming", get(handlers::incoming_invoices))
        .route("/invoices/batch-send", post(handlers::batch_send))
        .route("/invoices/retry-failed", post(handlers::retry_failed))
        .route("/invoices/:id", get(handlers::get_record))
        .route("/invoices/:id/send", post(handlers::send_invoice))
        .route("/invoices/:id/status", get(handlers::check_status))
        .route("/invoices/:id/cancel", post(handlers::cancel_invoice))
        .route("/invoices/:id/report", get(handlers::get_report))
        .route("/invoices/:id/response", post(handlers::invoice_response))
        .route(
            "/invoices/:id/xml",
            get(handlers::get_xml).post(handlers::generate_xml),
        )
        .route("/gateway/health", get(handlers::gateway_health))
        .with_state(state)
}
