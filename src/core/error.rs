use thiserror::Error;

use super::status::EInvoiceStatus;

/// Errors that can occur while preparing, submitting or reconciling an e-Invoice.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EFaturaError {
    /// A referenced invoice, order or e-Invoice record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input or invoice data failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The tax-authority gateway could not be reached or answered badly.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// XML generation error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Persistence layer failure.
    #[error("store error: {0}")]
    Store(String),

    /// A status write would leave the clearance state machine.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: EInvoiceStatus,
        to: EInvoiceStatus,
    },

    /// Configuration missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EFaturaError {
    /// Short machine-readable code persisted alongside failed records.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION",
            Self::Transport(t) => t.code(),
            Self::Xml(_) => "XML",
            Self::Store(_) => "STORE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Config(_) => "CONFIG",
        }
    }
}

/// Failures talking to the clearance gateway.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// Connection, TLS or timeout failure.
    #[error("network error: {0}")]
    Network(String),

    /// The gateway answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The gateway answered with a SOAP fault.
    #[error("gateway fault {code}: {message}")]
    Fault { code: String, message: String },

    /// The response body could not be understood.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Request payload could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl TransportError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "NETWORK",
            Self::Http { .. } => "HTTP",
            Self::Fault { .. } => "FAULT",
            Self::MalformedResponse(_) => "MALFORMED_RESPONSE",
            Self::Encoding(_) => "ENCODING",
        }
    }
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "customer.tax_number").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
    /// Rule identifier if applicable (e.g. "TR-VKN").
    pub rule: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "[{}] {}: {}", rule, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl ValidationError {
    /// Create a validation error without a rule ID.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    /// Create a validation error with a rule ID.
    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}

/// Collapse a list of validation errors into one `EFaturaError::Validation`.
pub fn join_validation_errors(errors: &[ValidationError]) -> EFaturaError {
    let joined = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    EFaturaError::Validation(joined)
}

pub type EFaturaResult<T> = std::result::Result<T, EFaturaError>;
