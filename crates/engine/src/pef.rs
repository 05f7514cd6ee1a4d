//! Portable Embosser Format: XML with `page` and `row` elements.

use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};

use crate::ParseError;

pub const PEF_NAMESPACE: &str = "http://www.daisy.org/ns/2008/pef";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Page,
    Row,
    Other,
}

enum Step {
    Open(Element),
    Empty(Element),
    Close(Element),
    Text(String),
    Skip,
    Eof,
}

/// Row text in document order, right-trimmed, handed out one `page` at a
/// time. Rows outside a `page` are ignored.
pub struct RowReader<'a> {
    reader: NsReader<&'a [u8]>,
    page_depth: usize,
    pages_seen: usize,
    row: Option<String>,
}

impl<'a> RowReader<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            reader: NsReader::from_str(content),
            page_depth: 0,
            pages_seen: 0,
            row: None,
        }
    }

    /// Reads up to the end of the next page. Returns `None` at end of input.
    pub fn next_page(&mut self) -> Result<Option<Vec<String>>, ParseError> {
        let mut rows = Vec::new();
        loop {
            match self.step()? {
                Step::Open(Element::Page) => self.page_depth += 1,
                Step::Open(Element::Row) if self.page_depth > 0 && self.row.is_none() => {
                    self.row = Some(String::new());
                }
                Step::Empty(Element::Row) if self.page_depth > 0 && self.row.is_none() => {
                    rows.push(String::new());
                }
                Step::Empty(Element::Page) => {
                    self.pages_seen += 1;
                    return Ok(Some(rows));
                }
                Step::Text(text) => {
                    if let Some(row) = self.row.as_mut() {
                        row.push_str(&text);
                    }
                }
                Step::Close(Element::Row) if self.row.is_some() => {
                    if let Some(row) = self.row.take() {
                        rows.push(row.trim_end().to_string());
                    }
                }
                Step::Close(Element::Page) if self.page_depth > 0 => {
                    self.page_depth -= 1;
                    self.pages_seen += 1;
                    return Ok(Some(rows));
                }
                Step::Eof => {
                    if self.page_depth > 0 || self.row.is_some() {
                        return Err(ParseError::Truncated);
                    }
                    if self.pages_seen == 0 {
                        return Err(ParseError::MissingElement("page".to_string()));
                    }
                    return Ok((!rows.is_empty()).then_some(rows));
                }
                _ => {}
            }
        }
    }

    fn step(&mut self) -> Result<Step, ParseError> {
        let (ns, event) = self.reader.read_resolved_event()?;
        let step = match event {
            Event::Start(e) => Step::Open(classify(&ns, e.local_name().as_ref())),
            Event::Empty(e) => Step::Empty(classify(&ns, e.local_name().as_ref())),
            Event::End(e) => Step::Close(classify(&ns, e.local_name().as_ref())),
            Event::Text(e) => Step::Text(String::from_utf8_lossy(e.as_ref()).into_owned()),
            Event::CData(e) => Step::Text(String::from_utf8_lossy(e.as_ref()).into_owned()),
            Event::GeneralRef(e) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                match resolve_entity(&entity) {
                    Some(text) => Step::Text(text),
                    None => Step::Skip,
                }
            }
            Event::Eof => Step::Eof,
            _ => Step::Skip,
        };
        Ok(step)
    }
}

fn classify(ns: &ResolveResult, local: &[u8]) -> Element {
    match ns {
        ResolveResult::Bound(Namespace(uri)) if *uri == PEF_NAMESPACE.as_bytes() => match local {
            b"page" => Element::Page,
            b"row" => Element::Row,
            _ => Element::Other,
        },
        _ => Element::Other,
    }
}

fn resolve_entity(entity: &str) -> Option<String> {
    let resolved = match entity {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok()?
            } else {
                return None;
            };
            return char::from_u32(code).map(String::from);
        }
    };
    Some(resolved.to_string())
}
