use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::{Decimal, RoundingStrategy};
use std::io::Cursor;

use crate::core::EFaturaError;

fn xml_io(e: std::io::Error) -> EFaturaError {
    EFaturaError::Xml(format!("XML write error: {e}"))
}

/// Streaming, indented XML writer with an XML declaration already emitted.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new() -> Result<Self, EFaturaError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_io)?;
        Ok(Self { writer })
    }

    pub fn into_string(self) -> Result<String, EFaturaError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| EFaturaError::Xml(format!("XML UTF-8 error: {e}")))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, EFaturaError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, EFaturaError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, EFaturaError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, EFaturaError> {
        self.start_element(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    pub fn text_element_with_attrs(
        &mut self,
        name: &str,
        text: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, EFaturaError> {
        self.start_element_with_attrs(name, attrs)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    /// Write only if `text` is present and non-blank.
    pub fn optional_text_element(
        &mut self,
        name: &str,
        text: Option<&str>,
    ) -> Result<&mut Self, EFaturaError> {
        match text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => self.text_element(name, t),
            None => Ok(self),
        }
    }

    /// Write a monetary amount (2 decimals) with currencyID attribute.
    pub fn amount_element(
        &mut self,
        name: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<&mut Self, EFaturaError> {
        self.text_element_with_attrs(name, &format_amount(amount), &[("currencyID", currency)])
    }

    /// Write an integer quantity with unitCode attribute.
    pub fn quantity_element(
        &mut self,
        name: &str,
        qty: u32,
        unit: &str,
    ) -> Result<&mut Self, EFaturaError> {
        self.text_element_with_attrs(name, &qty.to_string(), &[("unitCode", unit)])
    }
}

/// Round half away from zero to 2 places.
pub fn round_amount(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a monetary amount with exactly 2 decimal places.
pub fn format_amount(d: Decimal) -> String {
    let mut rounded = round_amount(d);
    rounded.rescale(2);
    rounded.to_string()
}

/// Format a rate without trailing zeros ("20", "1.5").
pub fn format_percent(d: Decimal) -> String {
    d.normalize().to_string()
}
