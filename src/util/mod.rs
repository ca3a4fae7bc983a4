//! Small shared helpers: URL resolution (eager and late), feed date
//! parsing, free-text mailbox parsing, HTML stripping.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use url::Url;

use crate::tree::{TagNode, TagValue};

/// Resolve `candidate` against `base`, returning the candidate unchanged
/// when either side is unusable. Never fails.
pub fn resolve(base: &str, candidate: &str) -> String {
    if base.is_empty() || candidate.is_empty() {
        return candidate.to_string();
    }
    match Url::parse(base) {
        Ok(base) => match base.join(candidate) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => candidate.to_string(),
        },
        Err(_) => candidate.to_string(),
    }
}

/// Child names whose plain-text value is treated as a URL during late
/// re-resolution.
const URL_TEXT_CHILDREN: &[&str] = &["logo", "icon", "link", "image", "url"];

/// Walk an already-built subtree and re-resolve every `href`/`src`/`uri`
/// attribute and every URL-bearing scalar text field against a base that
/// only became known after the subtree was built (e.g. a `self` link
/// discovered during metadata extraction). One-time tree rewrite.
pub fn reresolve(node: &mut TagNode, base: &str) {
    if base.is_empty() {
        return;
    }
    for (name, value) in node.children.iter_mut() {
        match value {
            TagValue::Text(text) => {
                if URL_TEXT_CHILDREN.contains(&name.as_str()) {
                    *text = resolve(base, text);
                }
            }
            TagValue::Element(child) => {
                for (attr, attr_value) in child.attributes.iter_mut() {
                    if attr == "href" || attr == "src" || attr == "uri" {
                        *attr_value = resolve(base, attr_value);
                    }
                }
                if URL_TEXT_CHILDREN.contains(&name.as_str()) && !child.text.is_empty() {
                    child.text = resolve(base, &child.text);
                }
                reresolve(child, base);
            }
        }
    }
}

/// Parse the date formats that actually occur in feeds: RFC 2822 (RSS),
/// RFC 3339 (Atom, Dublin Core), then a few sloppy variants.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%d %b %Y %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

/// A parsed free-text mailbox like `bob@example.com (Bob)` or
/// `Bob <bob@example.com>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mailbox {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Mailbox {
    /// The value used for an author field: the display name when known,
    /// else the address.
    pub fn display(&self) -> Option<String> {
        self.name.clone().or_else(|| self.email.clone())
    }
}

/// Parse the author/mailbox conventions RSS feeds use in free text.
pub fn parse_mailbox(raw: &str) -> Mailbox {
    let raw = raw.trim();
    if raw.is_empty() {
        return Mailbox::default();
    }
    // "Name <addr>"
    if let Some(open) = raw.find('<') {
        if let Some(close) = raw[open..].find('>') {
            let name = raw[..open].trim();
            let email = raw[open + 1..open + close].trim();
            return Mailbox {
                name: (!name.is_empty()).then(|| name.to_string()),
                email: (!email.is_empty()).then(|| email.to_string()),
            };
        }
    }
    // "addr (Name)"
    if let Some(open) = raw.find('(') {
        if let Some(close) = raw[open..].find(')') {
            let email = raw[..open].trim();
            let name = raw[open + 1..open + close].trim();
            return Mailbox {
                name: (!name.is_empty()).then(|| name.to_string()),
                email: (!email.is_empty()).then(|| email.to_string()),
            };
        }
    }
    if raw.contains('@') {
        Mailbox {
            name: None,
            email: Some(raw.to_string()),
        }
    } else {
        Mailbox {
            name: Some(raw.to_string()),
            email: None,
        }
    }
}

/// Aggressively strip HTML: drop every `<...>` span, then decode entities.
/// Best effort only; an unterminated `<` is left as-is.
pub fn strip_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    html_escape::decode_html_entities(&out).to_string()
}

/// Deduplicate preserving first-seen order.
pub fn dedup_preserving(values: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// Append `chunk` to `buf` without letting it grow past `max` bytes,
/// cutting at a char boundary.
pub fn push_limited(buf: &mut String, chunk: &str, max: usize) {
    if buf.len() >= max {
        return;
    }
    let room = max - buf.len();
    if chunk.len() <= room {
        buf.push_str(chunk);
    } else {
        let mut cut = room;
        while cut > 0 && !chunk.is_char_boundary(cut) {
            cut -= 1;
        }
        buf.push_str(&chunk[..cut]);
    }
}
