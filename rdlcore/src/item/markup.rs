//! `<CustomReportItem>` markup used by design-time tools.
//!
//! The fragment produced by [`CustomItemMarkup::to_xml`] is self-contained:
//!
//! ```xml
//! <CustomReportItem>
//!   <Type>BarCode</Type>
//!   <CustomProperties>
//!     <CustomProperty>
//!       <Name>Code</Name>
//!       <Value>=Fields!Sku.Value</Value>
//!     </CustomProperty>
//!   </CustomProperties>
//! </CustomReportItem>
//! ```
//!
//! [`CustomItemMarkup::parse`] reads that shape back from any well-formed
//! fragment: attributes, comments, CDATA sections and elements it does not
//! know (such as `<Style>`) are skipped.
use std::{borrow::Cow, fmt::Write};

use quick_xml::{
    Reader,
    escape::{escape, unescape},
    events::Event,
};

use crate::{
    magic::CUSTOM_REPORT_ITEM_TAG,
    utils::error::{RdlError, RdlResult},
};

/// One `<CustomProperty>` entry. Values are kept as written (literals or
/// `=`-prefixed expressions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomProperty {
    pub name: String,
    pub value: String,
}

/// Ordered property list of a custom report item.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CustomProperties(Vec<CustomProperty>);

impl CustomProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|prop| prop.name == name)
            .map(|prop| prop.value.as_str())
    }

    /// Sets `name`, replacing an existing entry in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|prop| prop.name == name) {
            Some(prop) => prop.value = value,
            None => self.0.push(CustomProperty { name, value }),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomProperty> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn markup_error(err: impl std::fmt::Display) -> RdlError {
    RdlError::MarkupParseError(err.to_string())
}

pub fn escape_xml(s: &str) -> String {
    escape(s).into_owned()
}

pub fn unescape_xml(s: &str) -> RdlResult<String> {
    unescape(s).map(Cow::into_owned).map_err(markup_error)
}

/// A custom report item as it appears in a report definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomItemMarkup {
    pub type_name: String,
    pub properties: CustomProperties,
}

impl CustomItemMarkup {
    pub fn new(type_name: impl Into<String>, properties: CustomProperties) -> Self {
        Self {
            type_name: type_name.into(),
            properties,
        }
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(xml, "<{}>", CUSTOM_REPORT_ITEM_TAG);
        let _ = writeln!(xml, "  <Type>{}</Type>", escape_xml(&self.type_name));
        xml.push_str("  <CustomProperties>\n");
        for prop in self.properties.iter() {
            xml.push_str("    <CustomProperty>\n");
            let _ = writeln!(xml, "      <Name>{}</Name>", escape_xml(&prop.name));
            let _ = writeln!(xml, "      <Value>{}</Value>", escape_xml(&prop.value));
            xml.push_str("    </CustomProperty>\n");
        }
        xml.push_str("  </CustomProperties>\n");
        let _ = write!(xml, "</{}>", CUSTOM_REPORT_ITEM_TAG);
        xml
    }

    pub fn parse(xml: &str) -> RdlResult<Self> {
        let mut reader = Reader::from_str(xml);
        let mut builder = MarkupBuilder::default();

        loop {
            match reader.read_event().map_err(markup_error)? {
                Event::Start(start) => builder.open(element_name(start.local_name().as_ref())?)?,
                Event::Empty(start) => {
                    builder.open(element_name(start.local_name().as_ref())?)?;
                    builder.close()?;
                }
                Event::End(_) => builder.close()?,
                Event::Text(text) => builder.text(&text.unescape().map_err(markup_error)?)?,
                Event::CData(data) => builder.text(std::str::from_utf8(&data).map_err(markup_error)?)?,
                Event::Eof => break,
                _ => {}
            }
        }

        builder.finish()
    }
}

fn element_name(raw: &[u8]) -> RdlResult<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(markup_error)
}

/// Collects a [`CustomItemMarkup`] from reader events. End tags are matched
/// against start tags by the reader itself.
#[derive(Default)]
struct MarkupBuilder {
    path: Vec<String>,
    text: String,
    type_name: Option<String>,
    properties: CustomProperties,
    name: Option<String>,
    value: Option<String>,
    done: bool,
}

impl MarkupBuilder {
    fn open(&mut self, tag: String) -> RdlResult<()> {
        if self.done {
            return Err(markup_error(format!("trailing element `<{}>`", tag)));
        }
        if self.path.is_empty() && tag != CUSTOM_REPORT_ITEM_TAG {
            return Err(markup_error(format!(
                "expected `<{}>`, found `<{}>`",
                CUSTOM_REPORT_ITEM_TAG, tag
            )));
        }
        if tag == "CustomProperty" {
            self.name = None;
            self.value = None;
        }
        self.path.push(tag);
        self.text.clear();
        Ok(())
    }

    fn close(&mut self) -> RdlResult<()> {
        let tag = self
            .path
            .pop()
            .ok_or_else(|| markup_error("unbalanced end tag"))?;
        let text = std::mem::take(&mut self.text);

        match (self.path.last().map(String::as_str), tag.as_str()) {
            (None, _) => self.done = true,
            (Some(CUSTOM_REPORT_ITEM_TAG), "Type") => self.type_name = Some(text),
            (Some("CustomProperty"), "Name") => self.name = Some(text),
            (Some("CustomProperty"), "Value") => self.value = Some(text),
            (Some("CustomProperties"), "CustomProperty") => {
                let name = self
                    .name
                    .take()
                    .ok_or_else(|| markup_error("`<CustomProperty>` without `<Name>`"))?;
                self.properties.set(name, self.value.take().unwrap_or_default());
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> RdlResult<()> {
        if self.path.is_empty() && !text.trim().is_empty() {
            return Err(markup_error(format!(
                "text outside `<{}>`",
                CUSTOM_REPORT_ITEM_TAG
            )));
        }
        self.text.push_str(text);
        Ok(())
    }

    fn finish(self) -> RdlResult<CustomItemMarkup> {
        if !self.done {
            return Err(markup_error(format!(
                "unterminated `<{}>`",
                CUSTOM_REPORT_ITEM_TAG
            )));
        }
        let type_name = self
            .type_name
            .ok_or_else(|| markup_error("missing `<Type>`"))?;
        Ok(CustomItemMarkup {
            type_name,
            properties: self.properties,
        })
    }
}
