//! XML to JSON value conversion.
//!
//! Produces the tree shape popularized by xml2js so that the classifier sees
//! the same structure for Tiled `.tmx`/`.tsx` files that the game runtime
//! expects:
//!
//! ```text
//! <map tiledversion="1.9.2">          {"map": {
//!   <tileset firstgid="1"/>             "$": {"tiledversion": "1.9.2"},
//!   <layer name="ground">               "tileset": [{"$": {"firstgid": "1"}}],
//!     <data>1,2,3</data>                "layer": [{"$": {"name": "ground"}, "data": ["1,2,3"], ...}],
//!   </layer>                            "$$": [{"#name": "tileset", ...}, {"#name": "layer", ...}]
//! </map>                              }}
//! ```
//!
//! - attributes live under `$`, character data under `_`
//! - children are grouped into arrays by element name
//! - `$$` keeps every child in document order, tagged with `#name`
//! - an element without attributes or children collapses to its text

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

/// Key holding an element's attributes.
pub const ATTR_KEY: &str = "$";
/// Key holding an element's character data.
pub const TEXT_KEY: &str = "_";
/// Key holding an element's children in document order.
pub const CHILDREN_KEY: &str = "$$";
/// Key naming an element inside the ordered children array.
pub const NAME_KEY: &str = "#name";

/// Error converting an XML document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MarkupError {
    /// Content is not valid UTF-8
    #[error("content is not UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    /// Syntax error reported by the XML reader
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),
    /// Malformed attribute
    #[error("invalid attribute: {0}")]
    Attribute(#[from] AttrError),
    /// Character data before or after the root element
    #[error("text outside of the root element")]
    TextOutsideRoot,
    /// No element at all
    #[error("document has no root element")]
    NoRoot,
    /// A second top-level element
    #[error("document has more than one root element")]
    MultipleRoots,
    /// Closing tag without a matching opening tag
    #[error("unbalanced closing tag")]
    Unbalanced,
    /// Document ended inside an element
    #[error("element <{0}> is not closed")]
    Unclosed(String),
    /// Entity that is neither predefined nor a character reference
    #[error("unknown entity reference '&{0};'")]
    UnknownEntity(String),
}

/// An element under construction.
struct Element {
    name: String,
    attrs: Map<String, Value>,
    text: String,
    /// Character data since the last child boundary
    pending: String,
    children: Vec<(String, Value)>,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, MarkupError> {
        let name = std::str::from_utf8(start.name().as_ref())?.to_string();
        let mut attrs = Map::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let value = unescape(std::str::from_utf8(&attr.value)?)?;
            attrs.insert(key, Value::String(value));
        }
        Ok(Self { name, attrs, text: String::new(), pending: String::new(), children: Vec::new() })
    }

    /// Keep the pending run of character data unless it is only whitespace.
    fn flush_text(&mut self) {
        if !self.pending.trim().is_empty() {
            self.text.push_str(&self.pending);
        }
        self.pending.clear();
    }

    fn finish(mut self) -> (String, Value) {
        self.flush_text();
        if self.attrs.is_empty() && self.children.is_empty() {
            return (self.name, Value::String(self.text));
        }

        let mut object = Map::new();
        if !self.attrs.is_empty() {
            object.insert(ATTR_KEY.to_string(), Value::Object(self.attrs));
        }
        if !self.text.is_empty() {
            object.insert(TEXT_KEY.to_string(), Value::String(self.text));
        }

        let mut ordered = Vec::with_capacity(self.children.len());
        for (name, child) in self.children {
            ordered.push(tag_child(&name, &child));
            if let Value::Array(items) =
                object.entry(name).or_insert_with(|| Value::Array(Vec::new()))
            {
                items.push(child);
            }
        }
        if !ordered.is_empty() {
            object.insert(CHILDREN_KEY.to_string(), Value::Array(ordered));
        }

        (self.name, Value::Object(object))
    }
}

fn tag_child(name: &str, child: &Value) -> Value {
    let mut tagged = Map::new();
    tagged.insert(NAME_KEY.to_string(), Value::String(name.to_string()));
    match child {
        Value::Object(fields) => {
            for (key, value) in fields {
                tagged.insert(key.clone(), value.clone());
            }
        }
        text => {
            tagged.insert(TEXT_KEY.to_string(), text.clone());
        }
    }
    Value::Object(tagged)
}

/// Parse an XML document into a JSON value.
pub fn parse_xml(bytes: &[u8]) -> Result<Value, MarkupError> {
    let source = std::str::from_utf8(bytes)?;
    let mut reader = Reader::from_str(source);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let element = open_child(&start, &mut stack, &root)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_child(&start, &mut stack, &root)?;
                close(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                let element = stack.pop().ok_or(MarkupError::Unbalanced)?;
                close(element, &mut stack, &mut root);
            }
            Event::Text(text) => {
                let raw = std::str::from_utf8(&text)?;
                match stack.last_mut() {
                    Some(element) => element.pending.push_str(&unescape(raw)?),
                    None if raw.trim().is_empty() => {}
                    None => return Err(MarkupError::TextOutsideRoot),
                }
            }
            Event::CData(data) => {
                let raw = std::str::from_utf8(&data)?;
                stack.last_mut().ok_or(MarkupError::TextOutsideRoot)?.pending.push_str(raw);
            }
            Event::GeneralRef(reference) => {
                let resolved = resolve_entity(std::str::from_utf8(&reference)?)?;
                stack.last_mut().ok_or(MarkupError::TextOutsideRoot)?.pending.push(resolved);
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(MarkupError::Unclosed(open.name));
    }
    let (name, value) = root.ok_or(MarkupError::NoRoot)?;

    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

fn open_child(
    start: &BytesStart<'_>,
    stack: &mut [Element],
    root: &Option<(String, Value)>,
) -> Result<Element, MarkupError> {
    match stack.last_mut() {
        Some(parent) => parent.flush_text(),
        None if root.is_some() => return Err(MarkupError::MultipleRoots),
        None => {}
    }
    Element::open(start)
}

fn close(element: Element, stack: &mut [Element], root: &mut Option<(String, Value)>) {
    let finished = element.finish();
    match stack.last_mut() {
        Some(parent) => parent.children.push(finished),
        None => *root = Some(finished),
    }
}

/// Resolve a predefined entity name or a character reference (`#123`, `#x7B`).
fn resolve_entity(name: &str) -> Result<char, MarkupError> {
    let resolved = match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => char_reference(name),
    };
    resolved.ok_or_else(|| MarkupError::UnknownEntity(name.to_string()))
}

fn char_reference(name: &str) -> Option<char> {
    let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => name.strip_prefix('#')?.parse().ok()?,
    };
    char::from_u32(code)
}

/// Replace entity references inside attribute values and text.
fn unescape(raw: &str) -> Result<String, MarkupError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find(';').ok_or_else(|| MarkupError::UnknownEntity(after.to_string()))?;
        out.push(resolve_entity(&after[..end])?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
