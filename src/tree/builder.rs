//! Incremental tag-tree construction from open/text/close events.
//!
//! The builder owns the three pieces of per-document mutable state: the
//! element stack (depth-first open elements), the xml:base stack (for
//! relative URL resolution) and the XHTML capture buffer (inline markup
//! re-serialized as text). One builder per in-flight document.

use tracing::debug;

use crate::scanner::OpenTag;
use crate::tree::{TagNode, TagValue};
use crate::util;

/// A finished element handed back to the driver for classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTag {
    /// Canonical element name.
    pub name: String,
    pub value: TagValue,
    /// True when this close emptied the stack (document root).
    pub is_root: bool,
}

#[derive(Debug)]
struct BaseScope {
    /// Canonical name of the element that introduced this base; the
    /// sentinel `"#document"` marks an externally supplied feed URL that
    /// no close event ever pops.
    element: String,
    uri: String,
}

#[derive(Debug, Default)]
struct XhtmlCapture {
    /// Name of the element whose inline markup is being captured.
    element: String,
    buf: String,
}

pub struct NodeBuilder {
    stack: Vec<TagNode>,
    base_stack: Vec<BaseScope>,
    xhtml: Option<XhtmlCapture>,
    max_text: usize,
}

impl NodeBuilder {
    pub fn new(max_text: usize) -> Self {
        NodeBuilder {
            stack: Vec::new(),
            base_stack: Vec::new(),
            xhtml: None,
            max_text,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Current base URI, if any xml:base scope (or seeded feed URL) is
    /// active.
    pub fn base(&self) -> Option<&str> {
        self.base_stack.last().map(|scope| scope.uri.as_str())
    }

    pub fn has_base(&self) -> bool {
        !self.base_stack.is_empty()
    }

    /// Seed the base stack before any document bytes, e.g. from a
    /// `feed_url` option or a `self` link discovered during metadata
    /// extraction. The sentinel scope is never popped.
    pub fn seed_base(&mut self, uri: impl Into<String>) {
        self.base_stack.push(BaseScope {
            element: "#document".to_string(),
            uri: uri.into(),
        });
    }

    /// The in-progress parent element, used for metadata extraction when
    /// the first item closes before its channel does.
    pub fn top_mut(&mut self) -> Option<&mut TagNode> {
        self.stack.last_mut()
    }

    pub fn open_tag(&mut self, tag: OpenTag) {
        let mut node = TagNode::new(tag.name.clone());
        node.local = tag.local;
        node.prefix = tag.prefix;
        node.ns_uri = tag.ns_uri;

        // Attributes in document order: href-like values resolve eagerly
        // against whatever base is active at this moment; xml:base itself
        // pushes a new scope; type="xhtml"/"html" arms the capture buffer.
        for (name, mut value) in tag.attributes {
            match name.as_str() {
                "href" | "src" | "uri" => {
                    if let Some(base) = self.base() {
                        value = util::resolve(base, &value);
                    }
                }
                "xml:base" => {
                    if let Some(base) = self.base() {
                        value = util::resolve(base, &value);
                    }
                    self.base_stack.push(BaseScope {
                        element: node.name.clone(),
                        uri: value.clone(),
                    });
                }
                "type" if (value == "xhtml" || value == "html") && self.xhtml.is_none() => {
                    self.xhtml = Some(XhtmlCapture {
                        element: node.name.clone(),
                        buf: String::new(),
                    });
                }
                _ => {}
            }
            node.attributes.push((name, value));
        }

        // Inside a capture, nested elements are re-serialized as literal
        // markup rather than structured children.
        if let Some(capture) = self.xhtml.as_mut() {
            if capture.element != node.name {
                let mut open = format!("<{}", node.name);
                for (name, value) in &node.attributes {
                    open.push_str(&format!(" {name}=\"{value}\""));
                }
                open.push('>');
                util::push_limited(&mut capture.buf, &open, self.max_text);
            }
        }

        self.stack.push(node);
    }

    pub fn text(&mut self, chars: &str) {
        if let Some(capture) = self.xhtml.as_mut() {
            util::push_limited(&mut capture.buf, chars, self.max_text);
        } else if let Some(node) = self.stack.last_mut() {
            util::push_limited(&mut node.text, chars, self.max_text);
        }
        // Text before the root element is discarded.
    }

    /// Pop and finish the current element. Returns an error when the
    /// scanner delivers a close with nothing open; the driver treats that
    /// as fatal for the document.
    pub fn close_tag(&mut self, name: &str) -> Result<ClosedTag, String> {
        let Some(mut node) = self.stack.pop() else {
            return Err(format!("unexpected </{name}> with no open element"));
        };

        // Atom logo/icon carry their URL as element text.
        if node.name == "logo" || node.name == "icon" {
            if let Some(base) = self.base() {
                node.text = util::resolve(base, node.text.trim());
            }
        }

        if self
            .base_stack
            .last()
            .is_some_and(|scope| scope.element == node.name)
        {
            self.base_stack.pop();
        }

        let capture_done = self
            .xhtml
            .as_ref()
            .is_some_and(|capture| capture.element == node.name);
        if capture_done {
            // End of the captured block: the re-serialized markup becomes
            // this element's text and any structured children built along
            // the way are dropped.
            let capture = self.xhtml.take().unwrap_or_default();
            util::push_limited(&mut node.text, capture.buf.trim(), self.max_text);
            node.children.clear();
            debug!(element = %node.name, "closed inline markup capture");
        } else if let Some(capture) = self.xhtml.as_mut() {
            util::push_limited(&mut capture.buf, &format!("</{name}>"), self.max_text);
        }

        let closed_name = node.name.clone();
        let value = node.into_value();

        match self.stack.last_mut() {
            Some(parent) => {
                parent.push_child(closed_name.clone(), value.clone());
                Ok(ClosedTag {
                    name: closed_name,
                    value,
                    is_root: false,
                })
            }
            None => Ok(ClosedTag {
                name: closed_name,
                value,
                is_root: true,
            }),
        }
    }
}
