use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::info;
use uuid::Uuid;

use super::AppState;
use super::dto::*;
use super::error::ApiError;
use crate::gib::{ReportFormat, ResponseDecision};

type ApiResult = Result<Response, ApiError>;

fn invoice_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid invoice ID".into()))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(v)| v)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

pub async fn send_invoice(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = invoice_id(&id)?;
    info!(invoice_id = id, "API: sending invoice to GIB");

    let outcome = state.service.send_e_invoice(id).await;
    if outcome.is_success() {
        Ok(Json(ApiResponse::with_message("Invoice sent successfully to GIB", outcome)).into_response())
    } else {
        let message = outcome.message();
        Ok((StatusCode::BAD_REQUEST, Json(ApiResponse::failure(message, outcome))).into_response())
    }
}

pub async fn check_status(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = invoice_id(&id)?;
    let record = state.service.get_record(id).await?;
    info!(invoice_id = id, uuid = %record.uuid, "API: checking invoice status");

    let check = state.service.check_invoice_status(record.uuid).await;
    Ok(Json(ApiResponse::data(check)).into_response())
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> ApiResult {
    let id = invoice_id(&id)?;
    let reason = required(body(payload)?.reason, "Cancellation reason is required")?;
    info!(invoice_id = id, "API: cancelling invoice");

    if state.service.cancel_invoice(id, &reason).await? {
        Ok(Json(ApiResponse::message("Invoice cancelled successfully")).into_response())
    } else {
        Err(ApiError::BadRequest("GIB refused the cancellation".into()))
    }
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<ReportQuery>, QueryRejection>,
) -> ApiResult {
    let id = invoice_id(&id)?;
    let format = match query(params)?.format {
        Some(raw) => raw
            .parse::<ReportFormat>()
            .map_err(|_| ApiError::BadRequest("Invalid format. Use PDF or HTML".into()))?,
        None => ReportFormat::default(),
    };
    let record = state.service.get_record(id).await?;

    let report = state
        .service
        .get_invoice_report(record.uuid, format)
        .await?
        .ok_or_else(|| ApiError::NotFound("Report not available".into()))?;

    let disposition = format!("attachment; filename=\"invoice-{id}.{}\"", format.extension());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report,
    )
        .into_response())
}

pub async fn incoming_invoices(State(state): State<AppState>) -> ApiResult {
    let invoices = state.service.receive_incoming_invoices().await?;
    Ok(Json(IncomingResponse {
        success: true,
        count: invoices.len(),
        data: invoices,
    })
    .into_response())
}

pub async fn invoice_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<InvoiceResponseRequest>, JsonRejection>,
) -> ApiResult {
    let uuid = Uuid::parse_str(id.trim())
        .map_err(|_| ApiError::BadRequest("Invalid invoice UUID".into()))?;
    let request = body(payload)?;
    let decision = required(request.status, "Status must be ACCEPTED or REJECTED")?
        .parse::<ResponseDecision>()
        .map_err(|_| ApiError::BadRequest("Status must be ACCEPTED or REJECTED".into()))?;
    let reason = request.reason.filter(|r| !r.trim().is_empty());
    if decision == ResponseDecision::Rejected && reason.is_none() {
        return Err(ApiError::BadRequest("Reason is required for rejection".into()));
    }
    info!(%uuid, decision = decision.as_str(), "API: sending invoice response");

    if state
        .service
        .send_invoice_response(uuid, decision, reason.as_deref())
        .await?
    {
        Ok(Json(ApiResponse::message(format!(
            "Invoice {} successfully",
            decision.as_str().to_ascii_lowercase()
        )))
        .into_response())
    } else {
        Err(ApiError::BadRequest("GIB refused the invoice response".into()))
    }
}

pub async fn list_records(
    State(state): State<AppState>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult {
    let filter = query(params)?.into_filter()?;
    let page = state.service.list_records(filter).await?;
    Ok(Json(ListResponse::from(page)).into_response())
}

pub async fn batch_send(
    State(state): State<AppState>,
    payload: Result<Json<BatchSendRequest>, JsonRejection>,
) -> ApiResult {
    let ids = body(payload)?
        .invoice_ids
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| ApiError::BadRequest("invoiceIds array is required".into()))?;
    info!(count = ids.len(), "API: batch sending invoices to GIB");

    let summary = state.service.send_batch(&ids).await;
    let message = format!(
        "Sent {} invoices successfully, {} failed",
        summary.successful, summary.failed
    );
    Ok(Json(ApiResponse::with_message(message, summary)).into_response())
}

pub async fn retry_failed(State(state): State<AppState>) -> ApiResult {
    info!("API: retrying failed invoices");
    let summary = state.service.retry_failed().await?;
    let message = if summary.total == 0 {
        "No failed invoices to retry".to_string()
    } else {
        format!(
            "Retried {} invoices: {} successful, {} failed",
            summary.total, summary.successful, summary.failed
        )
    };
    Ok(Json(ApiResponse::with_message(message, summary)).into_response())
}

pub async fn get_record(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let record = state.service.get_record(invoice_id(&id)?).await?;
    Ok(Json(ApiResponse::data(record)).into_response())
}

pub async fn generate_xml(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let id = invoice_id(&id)?;
    let record = state.service.generate_xml(id).await?;
    let data = GeneratedXml {
        uuid: record.uuid,
        xml_hash: record.xml_hash,
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("e-Invoice XML generated", data)),
    )
        .into_response())
}

pub async fn get_xml(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let xml = state.service.get_xml(invoice_id(&id)?).await?;
    Ok(([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml).into_response())
}

pub async fn gateway_health(State(state): State<AppState>) -> ApiResult {
    let reachable = state.service.gateway_reachable().await;
    Ok(Json(HealthResponse {
        success: true,
        reachable,
    })
    .into_response())
}
