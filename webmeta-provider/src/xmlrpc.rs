//! Minimal XML-RPC codec: enough to call OpenSubtitles.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::ProviderError;

/// An XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    Double(f64),
    Struct(BTreeMap<String, Value>),
    Array(Vec<Value>),
    Nil,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Member of a struct value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Struct(members) => members.get(key),
            _ => None,
        }
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Self::String(s) => {
                let _ = write!(out, "<string>{}</string>", escape(s.as_str()));
            }
            Self::Int(i) => {
                let _ = write!(out, "<int>{i}</int>");
            }
            Self::Bool(b) => {
                let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
            }
            Self::Double(d) => {
                let _ = write!(out, "<double>{d}</double>");
            }
            Self::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    let _ = write!(out, "<member><name>{}</name>", escape(name.as_str()));
                    value.write_xml(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
            Self::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.write_xml(out);
                }
                out.push_str("</data></array>");
            }
            Self::Nil => out.push_str("<nil/>"),
        }
        out.push_str("</value>");
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// Serialize a `methodCall` document.
pub fn build_request(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall>");
    let _ = write!(out, "<methodName>{}</methodName><params>", escape(method));
    for param in params {
        out.push_str("<param>");
        param.write_xml(&mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

enum Frame {
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>, Option<String>),
}

/// Parse a `methodResponse` document into its first parameter.
///
/// A `<fault>` response becomes [`ProviderError::Fault`].
pub fn parse_response(xml: &[u8]) -> Result<Value, ProviderError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut text = String::new();
    let mut finished: Option<Value> = None;
    let mut result: Option<Value> = None;
    let mut fault = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"value" | b"name" => text.clear(),
                b"array" => stack.push(Frame::Array(Vec::new())),
                b"struct" => stack.push(Frame::Struct(BTreeMap::new(), None)),
                b"fault" => fault = true,
                _ => text.clear(),
            },
            Event::Empty(ref e) => match e.name().as_ref() {
                b"nil" => finished = Some(Value::Nil),
                b"string" => finished = Some(Value::String(String::new())),
                b"value" => place(Value::String(String::new()), &mut stack, &mut result),
                b"array" => finished = Some(Value::Array(Vec::new())),
                b"struct" => finished = Some(Value::Struct(BTreeMap::new())),
                _ => {}
            },
            Event::Text(ref e) => text.push_str(&e.unescape()?),
            Event::CData(ref e) => text.push_str(&String::from_utf8_lossy(e)),
            Event::End(ref e) => match e.name().as_ref() {
                b"name" => {
                    if let Some(Frame::Struct(_, name)) = stack.last_mut() {
                        *name = Some(std::mem::take(&mut text));
                    }
                }
                b"value" => {
                    let value = finished
                        .take()
                        .unwrap_or_else(|| Value::String(std::mem::take(&mut text)));
                    place(value, &mut stack, &mut result);
                }
                b"array" => {
                    if let Some(Frame::Array(items)) = stack.pop() {
                        finished = Some(Value::Array(items));
                    }
                }
                b"struct" => {
                    if let Some(Frame::Struct(members, _)) = stack.pop() {
                        finished = Some(Value::Struct(members));
                    }
                }
                tag @ (b"string" | b"int" | b"i4" | b"i8" | b"boolean" | b"double"
                | b"dateTime.iso8601" | b"base64") => {
                    finished = Some(scalar(tag, std::mem::take(&mut text))?);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let value = result.ok_or_else(|| ProviderError::parse("XML-RPC response without value"))?;
    if fault {
        let code = value.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or("unknown fault");
        return Err(ProviderError::Fault(format!("{code}: {message}")));
    }
    Ok(value)
}

/// Attach a completed value to its container, or make it the result.
fn place(value: Value, stack: &mut [Frame], result: &mut Option<Value>) {
    match stack.last_mut() {
        Some(Frame::Array(items)) => items.push(value),
        Some(Frame::Struct(members, name)) => {
            if let Some(name) = name.take() {
                members.insert(name, value);
            }
        }
        None => {
            if result.is_none() {
                *result = Some(value);
            }
        }
    }
}

fn scalar(tag: &[u8], text: String) -> Result<Value, ProviderError> {
    let invalid = || {
        ProviderError::parse(format!(
            "invalid XML-RPC {} '{}'",
            String::from_utf8_lossy(tag),
            text
        ))
    };
    Ok(match tag {
        b"int" | b"i4" | b"i8" => Value::Int(text.trim().parse().map_err(|_| invalid())?),
        b"boolean" => match text.trim() {
            "1" => Value::Bool(true),
            "0" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        b"double" => Value::Double(text.trim().parse().map_err(|_| invalid())?),
        _ => Value::String(text),
    })
}
