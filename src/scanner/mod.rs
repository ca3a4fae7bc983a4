//! The tokenizing XML collaborator: wraps a [`quick_xml::NsReader`] and
//! turns its namespace-resolved events into the flat [`ScanEvent`] stream
//! the driver loop consumes.
//!
//! Names are lowercased and rewritten to their canonical prefixed form
//! here, so the rest of the pipeline never sees a document-chosen prefix.

use std::io::BufRead;

use quick_xml::encoding::Decoder;
use quick_xml::events::Event;
use quick_xml::name::{QName, ResolveResult};
use quick_xml::reader::NsReader;

use crate::domain::XmlDecl;
use crate::namespace;

/// One discrete event from the scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Open(OpenTag),
    /// Canonical name of the element being closed.
    Close(String),
    /// Character data (text and CDATA are treated identically).
    Text(String),
    /// The `<?xml ...?>` declaration's pseudo-attributes.
    Declaration(XmlDecl),
    End,
}

/// An open tag with canonicalized names and trimmed attribute values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenTag {
    /// Canonical name, e.g. `title`, `dc:date`, `rdf:rdf`.
    pub name: String,
    pub local: String,
    /// Prefix as written in the document, lowercased.
    pub prefix: Option<String>,
    pub ns_uri: Option<String>,
    /// Canonical attribute names (lowercased; `xmlns*` kept verbatim).
    pub attributes: Vec<(String, String)>,
}

/// A scanner-level failure. Only I/O errors are beyond recovery; syntax
/// errors leave the reader in a state it can continue from.
#[derive(Debug, Clone)]
pub struct ScanError {
    pub message: String,
    pub fatal: bool,
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ScanError {}

pub struct Scanner<R: BufRead> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> Scanner<R> {
    pub fn new(source: R) -> Self {
        let mut reader = NsReader::from_reader(source);
        // Self-closing tags become open+close pairs so the tree builder
        // sees a uniform event shape.
        reader.config_mut().expand_empty_elements = true;
        Scanner {
            reader,
            buf: Vec::new(),
            done: false,
        }
    }

    /// Next event, or `None` after the end of the document has been
    /// delivered. Syntax errors are returned as `Err` but the scanner can
    /// be polled again to resume.
    pub fn next_event(&mut self) -> Result<Option<ScanEvent>, ScanError> {
        if self.done {
            return Ok(None);
        }
        loop {
            self.buf.clear();
            let decoder = self.reader.decoder();
            let (resolution, event) = match self.reader.read_resolved_event_into(&mut self.buf) {
                Ok(pair) => pair,
                Err(err) => {
                    let fatal = matches!(err, quick_xml::Error::Io(_));
                    return Err(ScanError {
                        message: err.to_string(),
                        fatal,
                    });
                }
            };
            let ns_uri = bound_uri(&resolution);
            match event {
                Event::Start(start) => {
                    let (name, local, prefix) = names(start.name(), ns_uri.as_deref());
                    let mut attributes = Vec::new();
                    for attr in start.attributes().with_checks(false) {
                        let Ok(attr) = attr else { continue };
                        let key = attribute_name(&self.reader, attr.key);
                        // Malformed values degrade to empty, never abort.
                        let value = attr
                            .decode_and_unescape_value(decoder)
                            .map(|v| v.trim().to_string())
                            .unwrap_or_default();
                        attributes.push((key, value));
                    }
                    return Ok(Some(ScanEvent::Open(OpenTag {
                        name,
                        local,
                        prefix,
                        ns_uri,
                        attributes,
                    })));
                }
                Event::End(end) => {
                    let (name, _, _) = names(end.name(), ns_uri.as_deref());
                    return Ok(Some(ScanEvent::Close(name)));
                }
                Event::Text(text) => {
                    let decoded = decode(decoder, text.as_ref());
                    let unescaped = quick_xml::escape::unescape(&decoded)
                        .map(|s| s.into_owned())
                        .unwrap_or(decoded);
                    return Ok(Some(ScanEvent::Text(unescaped)));
                }
                Event::CData(cdata) => {
                    return Ok(Some(ScanEvent::Text(decode(decoder, cdata.as_ref()))));
                }
                Event::Decl(decl) => {
                    let version = decl.version().ok().map(|v| decode(decoder, &v));
                    let encoding = decl
                        .encoding()
                        .and_then(|e| e.ok())
                        .map(|e| decode(decoder, &e));
                    let standalone = decl
                        .standalone()
                        .and_then(|s| s.ok())
                        .map(|s| decode(decoder, &s));
                    return Ok(Some(ScanEvent::Declaration(XmlDecl {
                        version,
                        encoding,
                        standalone,
                    })));
                }
                Event::Eof => {
                    self.done = true;
                    return Ok(Some(ScanEvent::End));
                }
                // Comments, doctype and non-declaration processing
                // instructions carry nothing a feed consumer needs.
                Event::Comment(_) | Event::DocType(_) | Event::PI(_) | Event::Empty(_) => continue,
            }
        }
    }
}

fn decode(decoder: Decoder, bytes: &[u8]) -> String {
    decoder
        .decode(bytes)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

/// Canonical (name, local, document prefix) for an element QName.
fn names(qname: QName<'_>, ns_uri: Option<&str>) -> (String, String, Option<String>) {
    let local = String::from_utf8_lossy(qname.local_name().as_ref()).to_lowercase();
    let prefix = qname
        .prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).to_lowercase());
    let name = canonical_name(&local, prefix.as_deref(), ns_uri);
    (name, local, prefix)
}

/// Canonical attribute name. `xmlns` declarations are kept as written
/// (lowercased) because the metadata record reports them verbatim.
/// Unlike elements, prefixed attributes never collapse to a bare local
/// name (`rdf:resource` stays `rdf:resource`).
fn attribute_name<R>(reader: &NsReader<R>, key: QName<'_>) -> String {
    let raw = String::from_utf8_lossy(key.as_ref()).to_lowercase();
    if raw == "xmlns" || raw.starts_with("xmlns:") || key.prefix().is_none() {
        return raw;
    }
    let (resolution, local) = reader.resolve_attribute(key);
    let local = String::from_utf8_lossy(local.as_ref()).to_lowercase();
    match bound_uri(&resolution).as_deref().and_then(namespace::prefix) {
        Some(canon) => format!("{canon}:{local}"),
        None => raw,
    }
}

fn bound_uri(resolution: &ResolveResult<'_>) -> Option<String> {
    match resolution {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    }
}

/// Rewrite a resolved name to its canonical form: core feed namespaces
/// collapse to the bare local name, known namespaces get their canonical
/// prefix, unknown ones keep the document's prefix.
fn canonical_name(local: &str, doc_prefix: Option<&str>, ns_uri: Option<&str>) -> String {
    match ns_uri {
        Some(uri) => match namespace::prefix(uri) {
            Some(_) if namespace::is_core(uri) => local.to_string(),
            Some(canon) => format!("{canon}:{local}"),
            None => match doc_prefix {
                Some(p) => format!("{p}:{local}"),
                None => local.to_string(),
            },
        },
        None => match doc_prefix {
            Some(p) => format!("{p}:{local}"),
            None => local.to_string(),
        },
    }
}
