use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::feed::{FeedImage, FeedMeta};
use crate::tree::TagValue;

/// A media attachment: RSS `<enclosure>`, `<media:content>`, or an Atom
/// `rel="enclosure"` link. Entries describing the same resource are
/// coalesced on the `(url, mime_type)` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Enclosure {
    pub url: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framerate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samplingrate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
}

impl Enclosure {
    /// Whether `other` describes the same resource.
    pub fn same_resource(&self, other: &Enclosure) -> bool {
        self.url == other.url && self.mime_type == other.mime_type
    }

    /// Merge a repeated description of the same resource; later
    /// occurrences overwrite earlier optional attributes.
    pub fn merge(&mut self, other: Enclosure) {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                }
            };
        }
        take!(length);
        take!(bitrate);
        take!(framerate);
        take!(samplingrate);
        take!(duration);
        take!(height);
        take!(width);
    }
}

/// `<source>` of an item: where a republished article originally ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArticleSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One normalized item/entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Article {
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub pubdate: Option<DateTime<Utc>>,
    pub link: Option<String>,
    /// Pre-proxy link (`feedburner:origlink` or a `rel="canonical"` link).
    pub origlink: Option<String>,
    pub author: Option<String>,
    pub guid: Option<String>,
    /// Set to the guid when the guid doubles as a dereferenceable URL
    /// (RSS `isPermaLink` semantics: anything but an explicit "false").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    pub comments: Option<String>,
    pub image: FeedImage,
    pub source: ArticleSource,
    pub categories: Vec<String>,
    pub enclosures: Vec<Enclosure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Box<FeedMeta>>,
    /// Unrecognized namespaced children, keyed by `prefix:localname`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, TagValue>,
}

impl Article {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }

    /// Best available body text for display.
    pub fn display_content(&self) -> &str {
        self.description
            .as_deref()
            .or(self.summary.as_deref())
            .unwrap_or("")
    }

    /// Add an enclosure, coalescing with an existing entry for the same
    /// resource instead of duplicating it.
    pub fn push_enclosure(&mut self, enclosure: Enclosure) {
        if enclosure.url.is_empty() {
            return;
        }
        match self
            .enclosures
            .iter_mut()
            .find(|existing| existing.same_resource(&enclosure))
        {
            Some(existing) => existing.merge(enclosure),
            None => self.enclosures.push(enclosure),
        }
    }
}
