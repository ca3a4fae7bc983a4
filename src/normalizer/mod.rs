//! Dialect detection and the per-dialect extraction strategies.
//!
//! A strategy is selected once, when the root element is seen, and carries
//! the few extraction rules that genuinely differ per dialect; everything
//! else is shared by [`meta`] and [`item`].

pub mod item;
pub mod meta;

use crate::domain::{ArticleSource, Dialect};
use crate::namespace;
use crate::scanner::OpenTag;
use crate::tree::TagValue;
use crate::util;

/// Outcome of classifying a candidate root element.
#[derive(Debug, Clone, PartialEq)]
pub struct Detected {
    pub dialect: Dialect,
    pub version: String,
}

/// Classify a top-level element. Runs only when the element stack is
/// empty; anything unrecognized means "not a feed".
pub fn detect(tag: &OpenTag) -> Option<Detected> {
    let version = tag
        .attributes
        .iter()
        .find(|(name, _)| name == "version")
        .map(|(_, value)| value.clone());
    let in_ns = |expected: &str| {
        tag.ns_uri
            .as_deref()
            .is_some_and(|uri| namespace::matches(uri, expected))
    };
    if tag.local == "rss" {
        Some(Detected {
            dialect: Dialect::Rss,
            version: version.unwrap_or_default(),
        })
    } else if tag.local == "rdf" && in_ns("rdf") {
        Some(Detected {
            dialect: Dialect::Rdf,
            version: version.unwrap_or_else(|| "1.0".to_string()),
        })
    } else if tag.local == "feed" && (tag.ns_uri.is_none() || in_ns("atom")) {
        Some(Detected {
            dialect: Dialect::Atom,
            version: version.unwrap_or_else(|| "1.0".to_string()),
        })
    } else {
        None
    }
}

/// The dialect-specific extraction hooks. Shared logic in [`meta`] and
/// [`item`] calls back through this for the points where RSS, Atom and
/// RDF genuinely disagree.
pub trait DialectStrategy: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Categories contributed by a plain `<category>` child.
    fn plain_categories(&self, value: &TagValue) -> Vec<String>;

    /// The item `<source>` element.
    fn source(&self, value: &TagValue) -> ArticleSource;
}

pub struct RssStrategy;
pub struct AtomStrategy;
pub struct RdfStrategy;

impl DialectStrategy for RssStrategy {
    fn dialect(&self) -> Dialect {
        Dialect::Rss
    }

    // RSS category text is a single category, commas and all.
    fn plain_categories(&self, value: &TagValue) -> Vec<String> {
        value
            .text()
            .map(|text| vec![text.to_string()])
            .unwrap_or_default()
    }

    fn source(&self, value: &TagValue) -> ArticleSource {
        ArticleSource {
            title: value.text().map(str::to_string),
            url: value.attr("url").map(str::to_string),
        }
    }
}

impl DialectStrategy for AtomStrategy {
    fn dialect(&self) -> Dialect {
        Dialect::Atom
    }

    fn plain_categories(&self, value: &TagValue) -> Vec<String> {
        value
            .attr("term")
            .filter(|term| !term.is_empty())
            .map(|term| vec![term.to_string()])
            .unwrap_or_default()
    }

    fn source(&self, value: &TagValue) -> ArticleSource {
        let Some(el) = value.as_element() else {
            return ArticleSource::default();
        };
        ArticleSource {
            title: el.child_text("title").map(str::to_string),
            url: el
                .child("link")
                .and_then(|link| link.attr("href"))
                .map(str::to_string),
        }
    }
}

impl DialectStrategy for RdfStrategy {
    fn dialect(&self) -> Dialect {
        Dialect::Rdf
    }

    // RSS 1.0 categories behave like RSS 2.0 ones.
    fn plain_categories(&self, value: &TagValue) -> Vec<String> {
        RssStrategy.plain_categories(value)
    }

    // RSS 1.0 defines no source element.
    fn source(&self, _value: &TagValue) -> ArticleSource {
        ArticleSource::default()
    }
}

pub fn strategy(dialect: Dialect) -> &'static dyn DialectStrategy {
    match dialect {
        Dialect::Rss => &RssStrategy,
        Dialect::Atom => &AtomStrategy,
        Dialect::Rdf => &RdfStrategy,
    }
}

/// Collect categories from every source element, in document order,
/// deduplicated preserving first-seen order. `dc:subject` splits on
/// whitespace; plain `<category>` handling is dialect-specific;
/// `itunes:category` supports one level of nesting.
pub(crate) fn collect_categories(
    strategy: &dyn DialectStrategy,
    children: &[(String, TagValue)],
) -> Vec<String> {
    let mut categories = Vec::new();
    for (name, value) in children {
        match name.as_str() {
            "category" => categories.extend(strategy.plain_categories(value)),
            "dc:subject" => {
                if let Some(text) = value.text() {
                    categories.extend(text.split_whitespace().map(str::to_string));
                }
            }
            "itunes:category" => {
                let Some(parent) = value.attr("text").filter(|t| !t.is_empty()) else {
                    continue;
                };
                let mut had_sub = false;
                if let Some(el) = value.as_element() {
                    for sub in el.children_named("itunes:category") {
                        if let Some(child) = sub.attr("text").filter(|t| !t.is_empty()) {
                            categories.push(format!("{parent}/{child}"));
                            had_sub = true;
                        }
                    }
                }
                if !had_sub {
                    categories.push(parent.to_string());
                }
            }
            "media:category" => {
                if let Some(text) = value.text() {
                    categories.push(text.to_string());
                }
            }
            _ => {}
        }
    }
    util::dedup_preserving(categories)
}

/// Passthrough key for an unrecognized child: prefixed names go through
/// as-is, unprefixed ones get the dialect's own prefix.
pub(crate) fn passthrough_key(dialect: Dialect, name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{dialect}:{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TagNode;

    fn open_tag(local: &str, ns: Option<&str>, attrs: &[(&str, &str)]) -> OpenTag {
        OpenTag {
            name: local.to_string(),
            local: local.to_string(),
            prefix: None,
            ns_uri: ns.map(str::to_string),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_detect_rss() {
        let detected = detect(&open_tag("rss", None, &[("version", "2.0")])).unwrap();
        assert_eq!(detected.dialect, Dialect::Rss);
        assert_eq!(detected.version, "2.0");
    }

    #[test]
    fn test_detect_rdf_requires_namespace() {
        let ns = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
        let detected = detect(&open_tag("rdf", Some(ns), &[])).unwrap();
        assert_eq!(detected.dialect, Dialect::Rdf);
        assert_eq!(detected.version, "1.0");
        assert!(detect(&open_tag("rdf", None, &[])).is_none());
    }

    #[test]
    fn test_detect_atom_defaults_version() {
        let ns = "http://www.w3.org/2005/Atom";
        let detected = detect(&open_tag("feed", Some(ns), &[])).unwrap();
        assert_eq!(detected.dialect, Dialect::Atom);
        assert_eq!(detected.version, "1.0");
    }

    #[test]
    fn test_detect_rejects_html() {
        assert!(detect(&open_tag("html", None, &[])).is_none());
    }

    #[test]
    fn test_rss_categories_not_comma_split() {
        let cats = RssStrategy
            .plain_categories(&TagValue::Text("Water Pollution, NYC".to_string()));
        assert_eq!(cats, vec!["Water Pollution, NYC"]);
    }

    #[test]
    fn test_dc_subject_splits_on_whitespace() {
        let children = vec![(
            "dc:subject".to_string(),
            TagValue::Text("a b c".to_string()),
        )];
        assert_eq!(
            collect_categories(&RssStrategy, &children),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_itunes_nested_categories() {
        let mut outer = TagNode::new("itunes:category");
        outer.set_attr("text", "Technology".to_string());
        let mut inner = TagNode::new("itunes:category");
        inner.set_attr("text", "Gadgets".to_string());
        outer.push_child("itunes:category".to_string(), TagValue::Element(inner));
        let children = vec![("itunes:category".to_string(), TagValue::Element(outer))];
        assert_eq!(
            collect_categories(&AtomStrategy, &children),
            vec!["Technology/Gadgets"]
        );
    }

    #[test]
    fn test_categories_deduplicated_in_order() {
        let children = vec![
            ("category".to_string(), TagValue::Text("b".to_string())),
            ("category".to_string(), TagValue::Text("a".to_string())),
            ("category".to_string(), TagValue::Text("b".to_string())),
        ];
        assert_eq!(collect_categories(&RssStrategy, &children), vec!["b", "a"]);
    }

    #[test]
    fn test_passthrough_key_prefixing() {
        assert_eq!(passthrough_key(Dialect::Rss, "ttl"), "rss:ttl");
        assert_eq!(passthrough_key(Dialect::Rss, "geo:lat"), "geo:lat");
    }
}
