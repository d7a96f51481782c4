//! In-memory element tree for a Layer Catalog site document.
//!
//! Built from a `quick_xml` event stream. Only elements and their attributes
//! are kept; text, comments and processing instructions are dropped.

use crate::error::{Error, Result};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Placeholder path used in errors for documents parsed from memory.
const IN_MEMORY: &str = "<memory>";

/// A single XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    /// Qualified tag name as written in the document.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Look up an attribute the catalog schema requires.
    pub fn require_attr(&self, name: &'static str) -> Result<&str> {
        self.attr(name).ok_or_else(|| Error::MissingAttribute {
            element: self.tag.clone(),
            attribute: name,
        })
    }

    /// Child elements in document order.
    pub fn children(&self) -> std::slice::Iter<'_, Element> {
        self.children.iter()
    }

    /// Child elements whose tag equals `tag`, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }
}

/// A parsed catalog document. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct CatalogDocument {
    path: PathBuf,
    root: Element,
}

impl CatalogDocument {
    /// Read and parse the catalog at `path`.
    ///
    /// The text encoding comes from the byte order mark, then the XML
    /// declaration, and defaults to UTF-8.
    pub fn open(path: &Path) -> Result<Self> {
        let fail = |message: String| Error::Parse {
            path: path.to_path_buf(),
            message,
        };
        let bytes = std::fs::read(path).map_err(|e| fail(e.to_string()))?;
        let xml = decode(&bytes).map_err(&fail)?;
        parse_at(&xml, path)
    }

    /// Parse a catalog held in memory.
    pub fn parse_str(xml: &str) -> Result<Self> {
        parse_at(xml, Path::new(IN_MEMORY))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Where the document was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn decode(bytes: &[u8]) -> std::result::Result<Cow<'_, str>, String> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => (declared_encoding(bytes)?, bytes),
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| format!("document is not valid {}", encoding.name()))
}

/// Encoding named in the XML declaration, UTF-8 when there is none.
fn declared_encoding(bytes: &[u8]) -> std::result::Result<&'static Encoding, String> {
    let mut reader = quick_xml::Reader::from_reader(bytes);
    let label = match reader.read_event() {
        Ok(Event::Decl(decl)) => match decl.encoding() {
            Some(Ok(label)) => label.into_owned(),
            Some(Err(e)) => return Err(format!("bad XML declaration: {e}")),
            None => return Ok(UTF_8),
        },
        _ => return Ok(UTF_8),
    };

    let encoding = Encoding::for_label(&label).ok_or_else(|| {
        format!("unknown encoding {:?}", String::from_utf8_lossy(&label))
    })?;
    if encoding == UTF_16LE || encoding == UTF_16BE {
        return Err(format!("{} document has no byte order mark", encoding.name()));
    }
    Ok(encoding)
}

fn parse_at(xml: &str, path: &Path) -> Result<CatalogDocument> {
    let fail = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    let mut reader = quick_xml::Reader::from_str(xml.trim_start_matches('\u{feff}'));
    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| fail(format!("at byte {}: {e}", reader.buffer_position())))?;

        match event {
            Event::Start(ref e) => open.push(element_from(e).map_err(&fail)?),
            Event::Empty(ref e) => {
                let element = element_from(e).map_err(&fail)?;
                attach(element, &mut open, &mut root).map_err(&fail)?;
            }
            Event::End(ref e) => {
                let element = open.pop().ok_or_else(|| {
                    fail(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
                attach(element, &mut open, &mut root).map_err(&fail)?;
            }
            Event::Text(ref t) if open.is_empty() => {
                if !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(fail("text outside the root element".to_string()));
                }
            }
            Event::CData(_) if open.is_empty() => {
                return Err(fail("CDATA outside the root element".to_string()));
            }
            Event::Text(ref t) => {
                let parent = open.last().map(|e| e.tag.as_str()).unwrap_or_default();
                if t.windows(3).any(|w| w == b"]]>") {
                    return Err(fail(format!("']]>' in character data of <{parent}>")));
                }
                t.unescape()
                    .map_err(|e| fail(format!("bad character data in <{parent}>: {e}")))?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(fail(format!("unclosed element <{}>", unclosed.tag)));
    }
    let root = root.ok_or_else(|| fail("document has no root element".to_string()))?;

    Ok(CatalogDocument {
        path: path.to_path_buf(),
        root,
    })
}

fn element_from(start: &BytesStart<'_>) -> std::result::Result<Element, String> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    if !is_xml_name(&tag) {
        return Err(format!("invalid element name <{tag}>"));
    }

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| format!("bad attribute on <{tag}>: {e}"))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if !is_xml_name(&key) {
            return Err(format!("invalid attribute name {key:?} on <{tag}>"));
        }
        let raw = String::from_utf8_lossy(&attr.value);
        if raw.contains('<') {
            return Err(format!("'<' in value of {key} on <{tag}>"));
        }
        let value = quick_xml::escape::unescape(&normalize_attr_whitespace(&raw))
            .map_err(|e| format!("bad value for {key} on <{tag}>: {e}"))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        tag,
        attributes,
        children: Vec::new(),
    })
}

/// Literal tabs and line breaks in an attribute value read as single spaces;
/// character references such as `&#10;` are untouched.
fn normalize_attr_whitespace(raw: &str) -> Cow<'_, str> {
    let is_break = |c: char| matches!(c, '\t' | '\n' | '\r');
    if raw.contains(is_break) {
        Cow::Owned(raw.replace("\r\n", " ").replace(is_break, " "))
    } else {
        Cow::Borrowed(raw)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':' || (!c.is_ascii() && !c.is_whitespace())
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_name_start(first) => {
            chars.all(|c| is_name_start(c) || c.is_ascii_digit() || matches!(c, '-' | '.'))
        }
        _ => false,
    }
}

/// Hand a finished element to its parent, or make it the root.
fn attach(
    element: Element,
    open: &mut [Element],
    root: &mut Option<Element>,
) -> std::result::Result<(), String> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(format!("second root element <{}>", element.tag))
    }
}
