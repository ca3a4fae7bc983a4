use serde::Serialize;

/// A finished child slot: either bare text (the "collapsed" form of an
/// element that carried nothing but character data) or a full element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    Text(String),
    Element(TagNode),
}

impl TagValue {
    /// The usable text of this value: the string itself, or the element's
    /// own accumulated text when non-empty.
    pub fn text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s.as_str()),
            TagValue::Element(node) => {
                if node.text.is_empty() {
                    None
                } else {
                    Some(node.text.as_str())
                }
            }
        }
    }

    pub fn as_element(&self) -> Option<&TagNode> {
        match self {
            TagValue::Element(node) => Some(node),
            TagValue::Text(_) => None,
        }
    }

    /// Attribute lookup that treats the text-only form as attribute-less.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.as_element().and_then(|node| node.attr(name))
    }

    /// Promote a collapsed text value back to a full node, for callers
    /// that need the uniform element shape.
    pub fn into_node(self, name: &str) -> TagNode {
        match self {
            TagValue::Element(node) => node,
            TagValue::Text(text) => {
                let mut node = TagNode::new(name);
                node.text = text;
                node
            }
        }
    }
}

/// One XML element under construction or finished: qualified name parts,
/// attributes, accumulated character data, and named children in document
/// order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TagNode {
    /// Canonical name as used for child keys, e.g. `title` or `dc:date`.
    pub name: String,
    pub local: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns_uri: Option<String>,
    /// Attributes with canonicalized names, document order, values trimmed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    /// Concatenated character data, trimmed when the element closes.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Children in document order. Repeated names simply repeat here;
    /// `child`/`children` provide the single-vs-list views.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<(String, TagValue)>,
}

impl TagNode {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let (prefix, local) = match name.split_once(':') {
            Some((p, l)) => (Some(p.to_string()), l.to_string()),
            None => (None, name.clone()),
        };
        TagNode {
            name,
            local,
            prefix,
            ..TagNode::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: String) {
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// First child with the given canonical name.
    pub fn child(&self, name: &str) -> Option<&TagValue> {
        self.children
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// All children with the given canonical name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TagValue> {
        self.children
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|(k, _)| k == name)
    }

    /// Text of the first child with the given name, if any.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|value| value.text())
    }

    /// Attach a finished child under its canonical name.
    pub fn push_child(&mut self, name: String, value: TagValue) {
        self.children.push((name, value));
    }

    /// Whether this node would collapse to plain text on close: character
    /// data only, no attributes, no children.
    pub fn is_text_only(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }

    /// Finished form of a closed node, applying the text-only collapse.
    pub fn into_value(mut self) -> TagValue {
        self.text = self.text.trim().to_string();
        if self.is_text_only() {
            TagValue::Text(self.text)
        } else {
            if self.text.trim().is_empty() {
                self.text.clear();
            }
            TagValue::Element(self)
        }
    }
}
