use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tree::TagValue;

/// Which syndication format produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Rss,
    Atom,
    Rdf,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Rss => "rss",
            Dialect::Atom => "atom",
            Dialect::Rdf => "rdf",
        };
        f.write_str(name)
    }
}

/// Feed image (RSS `<image>`, Atom `<logo>`, itunes/media fallbacks).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Pseudo-attributes captured from the `<?xml ...?>` declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct XmlDecl {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standalone: Option<String>,
}

/// Normalized feed-level metadata, one record per document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedMeta {
    pub dialect: Dialect,
    pub version: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Link to the website the feed describes.
    pub link: Option<String>,
    /// The canonical URL of the feed itself, as declared by the feed.
    pub xml_url: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub pubdate: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub image: FeedImage,
    pub favicon: Option<String>,
    pub copyright: Option<String>,
    pub generator: Option<String>,
    /// PubSubHubbub hub, from an Atom `rel="hub"` link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub: Option<String>,
    pub categories: Vec<String>,
    /// Namespace declarations found on the root element.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<(String, String)>,
    /// Non-namespace root attributes (minus `version`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub root_attrs: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml_decl: Option<XmlDecl>,
    /// Unrecognized namespaced children, keyed by `prefix:localname`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, TagValue>,
}

impl FeedMeta {
    pub fn new(dialect: Dialect, version: impl Into<String>) -> Self {
        FeedMeta {
            dialect,
            version: version.into(),
            title: None,
            description: None,
            link: None,
            xml_url: None,
            date: None,
            pubdate: None,
            author: None,
            language: None,
            image: FeedImage::default(),
            favicon: None,
            copyright: None,
            generator: None,
            hub: None,
            categories: Vec::new(),
            namespaces: Vec::new(),
            root_attrs: Vec::new(),
            xml_decl: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled feed)")
    }
}
