//! Delete manifest: the ordered key list of a bulk delete and its canonical XML form
//!
//! The canonical document is the XML declaration line, the `<Delete>` element
//! and a trailing newline. The same bytes feed the signed `content-md5` header
//! and the request body, so every serializer in the crate goes through
//! [`frame_document`] and [`write_delete_element`].

use crate::s3::error::{Result, S3Error};
use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;

/// XML declaration line prepended to every delete document
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Namespace of the S3 REST API documents
pub const S3_XMLNS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Key prefix used by [`DeleteManifest::build`]
pub const DEFAULT_KEY_PREFIX: &str = "key-";

/// A single object to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub key: String,
}

impl ObjectRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Ordered list of objects deleted in one batch
///
/// Immutable once built: the key list handed to the presigner and the
/// transmitted document are both derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteManifest {
    xmlns: String,
    objects: Vec<ObjectRef>,
}

impl DeleteManifest {
    /// Build `count` references named `key-0`, `key-1`, ...
    pub fn build(count: usize) -> Self {
        Self::build_with_prefix(DEFAULT_KEY_PREFIX, count)
    }

    /// Build `count` references named `{prefix}{index}`, zero-based
    pub fn build_with_prefix(prefix: &str, count: usize) -> Self {
        Self::from_keys((0..count).map(|i| format!("{}{}", prefix, i)))
    }

    /// Build a manifest from an explicit key list, preserving order
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            xmlns: S3_XMLNS.to_string(),
            objects: keys.into_iter().map(ObjectRef::new).collect(),
        }
    }

    pub fn objects(&self) -> &[ObjectRef] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Keys in manifest order
    pub fn keys(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.key.clone()).collect()
    }

    /// The `<Delete>` element alone, without declaration or trailing newline
    pub fn body(&self) -> String {
        let mut xml = String::with_capacity(self.objects.len() * 40 + 80);
        write_delete_element(&mut xml, &self.xmlns, self.objects.iter().map(|o| o.key.as_str()));
        xml
    }

    /// Canonical document bytes, as signed and as transmitted
    pub fn document(&self) -> Bytes {
        frame_document(self.body().as_bytes())
    }

    /// Parse a delete document back into a manifest.
    ///
    /// Accepts the element with or without the declaration line. Keys are
    /// taken verbatim (no whitespace trimming).
    pub fn parse(xml_data: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml_data);

        let mut xmlns: Option<String> = None;
        let mut objects = Vec::new();
        let mut in_object = false;
        let mut current_text = String::with_capacity(64);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    current_text.clear();
                    match e.local_name().as_ref() {
                        b"Delete" => {
                            for attr in e.attributes() {
                                let attr = attr.map_err(|e| S3Error::XmlParse(e.to_string()))?;
                                if attr.key.as_ref() == b"xmlns" {
                                    xmlns = Some(attr.unescape_value()?.into_owned());
                                }
                            }
                        }
                        b"Object" => in_object = true,
                        _ => {}
                    }
                }
                Ok(Event::Text(e)) => {
                    current_text.clear();
                    current_text.push_str(&e.unescape()?);
                }
                Ok(Event::End(e)) => {
                    match e.local_name().as_ref() {
                        b"Key" if in_object => {
                            objects.push(ObjectRef::new(std::mem::take(&mut current_text)));
                        }
                        b"Object" => in_object = false,
                        _ => {}
                    }
                    current_text.clear();
                }
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"Key" && in_object => {
                    objects.push(ObjectRef::new(String::new()));
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(S3Error::XmlParse(e.to_string())),
                _ => {}
            }
        }

        let xmlns = xmlns.ok_or_else(|| S3Error::XmlParse("missing <Delete> element".to_string()))?;
        Ok(Self { xmlns, objects })
    }
}

/// Wrap a `<Delete>` element into the canonical document: declaration + body + `\n`
pub fn frame_document(body: &[u8]) -> Bytes {
    let mut doc = Vec::with_capacity(XML_DECLARATION.len() + body.len() + 1);
    doc.extend_from_slice(XML_DECLARATION.as_bytes());
    doc.extend_from_slice(body);
    doc.push(b'\n');
    Bytes::from(doc)
}

/// Append `<Delete xmlns="..."><Object><Key>..</Key></Object>...</Delete>` to `buf`
pub fn write_delete_element<'a>(buf: &mut String, xmlns: &str, keys: impl IntoIterator<Item = &'a str>) {
    buf.push_str("<Delete xmlns=\"");
    xml_escape_into(buf, xmlns);
    buf.push_str("\">");
    for key in keys {
        buf.push_str("<Object><Key>");
        xml_escape_into(buf, key);
        buf.push_str("</Key></Object>");
    }
    buf.push_str("</Delete>");
}

/// Whether `ch` may appear in an XML 1.0 document
pub fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Escape XML special characters into an existing buffer.
///
/// Whitespace controls become character references so parsers cannot
/// normalize them away; characters XML cannot carry become U+FFFD.
fn xml_escape_into(buf: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            '\'' => buf.push_str("&apos;"),
            '\t' => buf.push_str("&#x9;"),
            '\n' => buf.push_str("&#xA;"),
            '\r' => buf.push_str("&#xD;"),
            _ if !is_xml_char(ch) => buf.push('\u{FFFD}'),
            _ => buf.push(ch),
        }
    }
}
