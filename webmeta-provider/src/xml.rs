//! Flat XML reader for TheTVDB documents.
//!
//! TheTVDB responses are one root element holding a list of records. A
//! record either carries text directly (`<Time>1300000000</Time>`) or a set
//! of single-level child fields (`<Series><id>80379</id>...</Series>`).
//! Deeper nesting does not occur and is flattened into the record's fields.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use webmeta_catalog::types::FieldMap;

use crate::error::ProviderError;

/// One child of the document root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlRecord {
    pub tag: String,
    pub text: Option<String>,
    pub fields: FieldMap,
}

impl XmlRecord {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Parse every record below the document root, in document order.
pub fn parse_records<R: BufRead>(reader: R) -> Result<Vec<XmlRecord>, ProviderError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut records = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<XmlRecord> = None;
    let mut field = String::new();

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                depth += 1;
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match depth {
                    1 => {}
                    2 => {
                        current = Some(XmlRecord {
                            tag,
                            ..XmlRecord::default()
                        })
                    }
                    _ => field = tag,
                }
            }
            Event::Empty(ref e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match depth {
                    1 => records.push(XmlRecord {
                        tag,
                        ..XmlRecord::default()
                    }),
                    0 => {}
                    _ => {
                        if let Some(ref mut record) = current {
                            record.fields.entry(tag).or_default();
                        }
                    }
                }
            }
            Event::Text(ref e) => {
                let text = e.unescape()?.to_string();
                if let Some(ref mut record) = current {
                    if depth == 2 {
                        record.text.get_or_insert_with(String::new).push_str(&text);
                    } else if depth > 2 {
                        record.fields.entry(field.clone()).or_default().push_str(&text);
                    }
                }
            }
            Event::CData(ref e) => {
                let text = String::from_utf8_lossy(e).to_string();
                if let Some(ref mut record) = current {
                    if depth > 2 {
                        record.fields.entry(field.clone()).or_default().push_str(&text);
                    }
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let Some(record) = current.take() {
                        records.push(record);
                    }
                } else if depth > 2 {
                    field.clear();
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}
