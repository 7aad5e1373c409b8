use crate::core::{EFaturaError, TransportError};
use crate::ubl::xml_utils::XmlWriter;

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const EFATURA_NS: &str = "http://www.gbislem.com/EFatura";

/// Gateway operations and their wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SendInvoice,
    CheckInvoiceStatus,
    GetIncomingInvoices,
    SendInvoiceResponse,
    CancelInvoice,
    GetInvoiceReport,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendInvoice => "SendInvoice",
            Self::CheckInvoiceStatus => "CheckInvoiceStatus",
            Self::GetIncomingInvoices => "GetIncomingInvoices",
            Self::SendInvoiceResponse => "SendInvoiceResponse",
            Self::CancelInvoice => "CancelInvoice",
            Self::GetInvoiceReport => "GetInvoiceReport",
        }
    }

    /// Path relative to the base URL.
    pub fn path(&self) -> String {
        format!("/EFatura/{}", self.name())
    }

    pub fn soap_action(&self) -> String {
        format!("{EFATURA_NS}/{}", self.name())
    }
}

pub struct Credentials<'a> {
    pub vkn: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

fn encoding(e: EFaturaError) -> TransportError {
    TransportError::Encoding(e.to_string())
}

/// Build the SOAP envelope for `op`.
///
/// Credentials come first in the operation element, followed by `fields`
/// in order; `None` fields are omitted.
pub fn build(
    op: Operation,
    credentials: &Credentials<'_>,
    fields: &[(&str, Option<&str>)],
) -> Result<String, TransportError> {
    let mut w = XmlWriter::new().map_err(encoding)?;
    w.start_element_with_attrs("soap:Envelope", &[("xmlns:soap", SOAP_ENV_NS)])
        .map_err(encoding)?;
    w.start_element("soap:Body").map_err(encoding)?;
    w.start_element_with_attrs(op.name(), &[("xmlns", EFATURA_NS)])
        .map_err(encoding)?;

    let credential_fields = [
        ("vkn", Some(credentials.vkn)),
        ("username", Some(credentials.username)),
        ("password", Some(credentials.password)),
    ];
    for (name, value) in credential_fields.iter().chain(fields) {
        if let Some(value) = value {
            w.text_element(name, value).map_err(encoding)?;
        }
    }

    w.end_element(op.name()).map_err(encoding)?;
    w.end_element("soap:Body").map_err(encoding)?;
    w.end_element("soap:Envelope").map_err(encoding)?;
    w.into_string().map_err(encoding)
}
