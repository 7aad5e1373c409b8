//! Request and response bodies of the HTTP surface.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::core::EInvoiceStatus;
use crate::store::{DEFAULT_PAGE_LIMIT, Page, RecordFilter};

/// `{success, message?, data?}` envelope used by most endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            error_message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::data(data)
        }
    }

    pub fn failure(error_message: impl Into<String>, data: T) -> Self {
        Self {
            success: false,
            message: None,
            error_message: Some(error_message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error_message: None,
            data: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceResponseRequest {
    pub status: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSendRequest {
    pub invoice_ids: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub gib_status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn into_filter(self) -> Result<RecordFilter, ApiError> {
        let status = non_empty(self.status)
            .map(|s| s.parse::<EInvoiceStatus>())
            .transpose()
            .map_err(ApiError::BadRequest)?;
        let start = non_empty(self.start_date)
            .map(|s| parse_date("startDate", &s, false))
            .transpose()?;
        let end = non_empty(self.end_date)
            .map(|s| parse_date("endDate", &s, true))
            .transpose()?;

        Ok(RecordFilter {
            status,
            gib_status: non_empty(self.gib_status),
            start,
            end,
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        }
        .normalized())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD`.
///
/// A bare end date covers the whole day.
pub fn parse_date(field: &str, value: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest(format!("{field} must be YYYY-MM-DD or RFC 3339, got '{value}'"))
    })?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        Some(NaiveTime::MIN)
    };
    time.map(|t| date.and_time(t).and_utc())
        .ok_or_else(|| ApiError::BadRequest(format!("{field} is out of range")))
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub pages: usize,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T: Serialize> From<Page<T>> for ListResponse<T> {
    fn from(page: Page<T>) -> Self {
        let pagination = Pagination {
            page: page.page,
            limit: page.limit,
            total: page.total,
            pages: page.total_pages(),
        };
        Self {
            success: true,
            data: page.items,
            pagination,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IncomingResponse<T: Serialize> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedXml {
    pub uuid: uuid::Uuid,
    pub xml_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub reachable: bool,
}
