//! Flattens a channel/feed/root tag node into a [`FeedMeta`] record.

use crate::domain::FeedMeta;
use crate::normalizer::{collect_categories, passthrough_key, DialectStrategy};
use crate::tree::{TagNode, TagValue};
use crate::util;

/// Children consumed by the extraction table; everything else lands in the
/// passthrough map. `item`/`entry` are structural and never passed through.
const RECOGNIZED: &[&str] = &[
    "title",
    "description",
    "subtitle",
    "tagline",
    "pubdate",
    "lastbuilddate",
    "published",
    "modified",
    "updated",
    "dc:date",
    "link",
    "managingeditor",
    "webmaster",
    "author",
    "language",
    "image",
    "logo",
    "icon",
    "copyright",
    "rights",
    "dc:rights",
    "generator",
    "category",
    "dc:subject",
    "itunes:category",
    "media:category",
    "itunes:summary",
    "itunes:author",
    "itunes:owner",
    "dc:creator",
    "dc:publisher",
    "dc:language",
    "itunes:image",
    "media:thumbnail",
    "media:copyright",
    "creativecommons:license",
    "cc:license",
    "admin:generatoragent",
    "item",
    "entry",
    "items",
];

/// Extract feed metadata from a (fully or partially) built channel/feed
/// node. The caller has already applied any late base re-resolution.
pub fn extract(strategy: &dyn DialectStrategy, node: &TagNode, meta: &mut FeedMeta, strip: bool) {
    let dialect = strategy.dialect();

    for (name, value) in &node.children {
        match name.as_str() {
            "title" => first_wins(&mut meta.title, clean(value, strip)),
            "description" | "subtitle" => {
                first_wins(&mut meta.description, clean(value, strip));
            }
            "pubdate" | "lastbuilddate" | "published" | "modified" | "updated" | "dc:date" => {
                let Some(date) = value.text().and_then(util::parse_date) else {
                    continue;
                };
                // Explicit publish-style tags win for pubdate, explicit
                // update-style tags win for date; first-wins otherwise.
                if meta.pubdate.is_none() || name == "pubdate" || name == "published" {
                    meta.pubdate = Some(date);
                }
                if meta.date.is_none()
                    || name == "lastbuilddate"
                    || name == "modified"
                    || name == "updated"
                {
                    meta.date = Some(date);
                }
            }
            "link" => {
                if let Some(href) = value.attr("href").filter(|h| !h.is_empty()) {
                    match value.attr("rel") {
                        None | Some("") | Some("alternate") => {
                            first_wins(&mut meta.link, Some(href.to_string()));
                        }
                        Some("self") => first_wins(&mut meta.xml_url, Some(href.to_string())),
                        Some("hub") => first_wins(&mut meta.hub, Some(href.to_string())),
                        _ => {}
                    }
                } else if let Some(text) = value.text() {
                    first_wins(&mut meta.link, Some(text.to_string()));
                }
            }
            "author" => {
                if let Some(author) = person(value) {
                    meta.author = Some(author);
                }
            }
            "managingeditor" => {
                if let Some(text) = value.text() {
                    meta.author = util::parse_mailbox(text).display();
                }
            }
            "webmaster" => {
                if meta.author.is_none() {
                    meta.author = value.text().and_then(|t| util::parse_mailbox(t).display());
                }
            }
            "language" => first_wins(&mut meta.language, value.text().map(str::to_string)),
            "image" | "logo" => match value {
                TagValue::Element(el) => {
                    if let Some(url) = el.child_text("url") {
                        first_wins(&mut meta.image.url, Some(url.to_string()));
                    }
                    if let Some(title) = el.child_text("title") {
                        first_wins(&mut meta.image.title, Some(title.to_string()));
                    }
                    if meta.image.url.is_none() && !el.text.is_empty() {
                        meta.image.url = Some(el.text.clone());
                    }
                }
                TagValue::Text(text) => first_wins(&mut meta.image.url, Some(text.clone())),
            },
            "icon" => first_wins(&mut meta.favicon, value.text().map(str::to_string)),
            "copyright" | "rights" | "dc:rights" => {
                first_wins(&mut meta.copyright, value.text().map(str::to_string));
            }
            "generator" => {
                let mut generator = value.text().unwrap_or_default().to_string();
                if let Some(version) = value.attr("version").filter(|v| !v.is_empty()) {
                    if !generator.is_empty() {
                        generator.push(' ');
                    }
                    generator.push('v');
                    generator.push_str(version);
                }
                if let Some(uri) = value.attr("uri").filter(|u| !u.is_empty()) {
                    if generator.is_empty() {
                        generator = uri.to_string();
                    } else {
                        generator.push_str(&format!(" ({uri})"));
                    }
                }
                if !generator.is_empty() {
                    first_wins(&mut meta.generator, Some(generator));
                }
            }
            _ => {}
        }

        if !RECOGNIZED.contains(&name.as_str()) {
            meta.extra
                .entry(passthrough_key(dialect, name))
                .or_insert_with(|| value.clone());
        }
    }

    // Namespaced fallback chains for whatever is still missing.
    if meta.description.is_none() {
        meta.description = node
            .child_text("itunes:summary")
            .or_else(|| node.child_text("tagline"))
            .map(str::to_string);
        if strip {
            meta.description = meta.description.take().map(|d| util::strip_html(&d));
        }
    }
    if meta.author.is_none() {
        meta.author = node
            .child_text("itunes:author")
            .map(str::to_string)
            .or_else(|| owner_name(node))
            .or_else(|| node.child_text("dc:creator").map(str::to_string))
            .or_else(|| node.child_text("dc:publisher").map(str::to_string));
    }
    if meta.language.is_none() {
        meta.language = node
            .attr("xml:lang")
            .or_else(|| node.child_text("dc:language"))
            .map(str::to_string);
    }
    if meta.image.url.is_none() {
        meta.image.url = node
            .child("itunes:image")
            .and_then(|image| image.attr("href"))
            .or_else(|| node.child("media:thumbnail").and_then(|t| t.attr("url")))
            .map(str::to_string);
    }
    if meta.copyright.is_none() {
        meta.copyright = node
            .child_text("media:copyright")
            .or_else(|| node.child_text("creativecommons:license"))
            .map(str::to_string)
            .or_else(|| {
                node.child("cc:license")
                    .and_then(|license| license.attr("rdf:resource"))
                    .map(str::to_string)
            });
    }
    if meta.generator.is_none() {
        meta.generator = node
            .child("admin:generatoragent")
            .and_then(|agent| agent.attr("rdf:resource"))
            .map(str::to_string);
    }

    meta.categories = collect_categories(strategy, &node.children);
}

fn first_wins(slot: &mut Option<String>, candidate: Option<String>) {
    if slot.is_none() {
        if let Some(candidate) = candidate.filter(|c| !c.is_empty()) {
            *slot = Some(candidate);
        }
    }
}

fn clean(value: &TagValue, strip: bool) -> Option<String> {
    let text = value.text()?;
    if strip {
        Some(util::strip_html(text))
    } else {
        Some(text.to_string())
    }
}

/// Atom structured author (`name`/`email`/`uri` children) or a free-text
/// mailbox.
fn person(value: &TagValue) -> Option<String> {
    if let Some(el) = value.as_element() {
        if let Some(name) = el
            .child_text("name")
            .or_else(|| el.child_text("email"))
            .or_else(|| el.child_text("uri"))
        {
            return Some(name.to_string());
        }
    }
    value.text().and_then(|t| util::parse_mailbox(t).display())
}

fn owner_name(node: &TagNode) -> Option<String> {
    node.child("itunes:owner")
        .and_then(|owner| owner.as_element())
        .and_then(|owner| owner.child_text("itunes:name"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Dialect;
    use crate::normalizer::{AtomStrategy, RssStrategy};

    fn text_child(node: &mut TagNode, name: &str, text: &str) {
        node.push_child(name.to_string(), TagValue::Text(text.to_string()));
    }

    fn meta_for(dialect: Dialect) -> FeedMeta {
        FeedMeta::new(dialect, "2.0")
    }

    #[test]
    fn test_basic_rss_channel() {
        let mut channel = TagNode::new("channel");
        text_child(&mut channel, "title", "Liftoff News");
        text_child(&mut channel, "link", "http://liftoff.msfc.nasa.gov/");
        text_child(&mut channel, "description", "Liftoff to Space Exploration.");
        text_child(&mut channel, "language", "en-us");
        let mut meta = meta_for(Dialect::Rss);
        extract(&RssStrategy, &channel, &mut meta, false);
        assert_eq!(meta.title.as_deref(), Some("Liftoff News"));
        assert_eq!(meta.link.as_deref(), Some("http://liftoff.msfc.nasa.gov/"));
        assert_eq!(meta.language.as_deref(), Some("en-us"));
    }

    #[test]
    fn test_atom_links_by_rel() {
        let mut feed = TagNode::new("feed");
        for (rel, href) in [
            ("self", "http://example.com/feed"),
            ("alternate", "http://example.com/"),
            ("hub", "http://hub.example.com/"),
        ] {
            let mut link = TagNode::new("link");
            link.set_attr("rel", rel.to_string());
            link.set_attr("href", href.to_string());
            feed.push_child("link".to_string(), TagValue::Element(link));
        }
        let mut meta = meta_for(Dialect::Atom);
        extract(&AtomStrategy, &feed, &mut meta, false);
        assert_eq!(meta.link.as_deref(), Some("http://example.com/"));
        assert_eq!(meta.xml_url.as_deref(), Some("http://example.com/feed"));
        assert_eq!(meta.hub.as_deref(), Some("http://hub.example.com/"));
    }

    #[test]
    fn test_date_precedence() {
        let mut channel = TagNode::new("channel");
        text_child(&mut channel, "lastbuilddate", "Tue, 10 Jun 2003 09:41:01 GMT");
        text_child(&mut channel, "pubdate", "Tue, 10 Jun 2003 04:00:00 GMT");
        let mut meta = meta_for(Dialect::Rss);
        extract(&RssStrategy, &channel, &mut meta, false);
        // lastbuilddate seeds both, explicit pubdate then wins for pubdate.
        assert_eq!(
            meta.pubdate.unwrap().to_rfc2822(),
            "Tue, 10 Jun 2003 04:00:00 +0000"
        );
        assert_eq!(
            meta.date.unwrap().to_rfc2822(),
            "Tue, 10 Jun 2003 09:41:01 +0000"
        );
    }

    #[test]
    fn test_rss_image_block() {
        let mut channel = TagNode::new("channel");
        let mut image = TagNode::new("image");
        text_child(&mut image, "url", "http://example.com/logo.png");
        text_child(&mut image, "title", "Example");
        channel.push_child("image".to_string(), TagValue::Element(image));
        let mut meta = meta_for(Dialect::Rss);
        extract(&RssStrategy, &channel, &mut meta, false);
        assert_eq!(meta.image.url.as_deref(), Some("http://example.com/logo.png"));
        assert_eq!(meta.image.title.as_deref(), Some("Example"));
    }

    #[test]
    fn test_generator_enrichment() {
        let mut channel = TagNode::new("channel");
        let mut generator = TagNode::new("generator");
        generator.text = "Weblog Editor".to_string();
        generator.set_attr("version", "2.0".to_string());
        generator.set_attr("uri", "http://www.example.com/".to_string());
        channel.push_child("generator".to_string(), TagValue::Element(generator));
        let mut meta = meta_for(Dialect::Rss);
        extract(&RssStrategy, &channel, &mut meta, false);
        assert_eq!(
            meta.generator.as_deref(),
            Some("Weblog Editor v2.0 (http://www.example.com/)")
        );
    }

    #[test]
    fn test_itunes_fallbacks() {
        let mut channel = TagNode::new("channel");
        text_child(&mut channel, "itunes:summary", "A show about things");
        text_child(&mut channel, "itunes:author", "The Host");
        let mut image = TagNode::new("itunes:image");
        image.set_attr("href", "http://example.com/art.jpg".to_string());
        channel.push_child("itunes:image".to_string(), TagValue::Element(image));
        let mut meta = meta_for(Dialect::Rss);
        extract(&RssStrategy, &channel, &mut meta, false);
        assert_eq!(meta.description.as_deref(), Some("A show about things"));
        assert_eq!(meta.author.as_deref(), Some("The Host"));
        assert_eq!(meta.image.url.as_deref(), Some("http://example.com/art.jpg"));
    }

    #[test]
    fn test_managing_editor_mailbox() {
        let mut channel = TagNode::new("channel");
        text_child(&mut channel, "managingeditor", "editor@example.com (Edna Editor)");
        let mut meta = meta_for(Dialect::Rss);
        extract(&RssStrategy, &channel, &mut meta, false);
        assert_eq!(meta.author.as_deref(), Some("Edna Editor"));
    }

    #[test]
    fn test_unrecognized_children_passed_through() {
        let mut channel = TagNode::new("channel");
        text_child(&mut channel, "ttl", "60");
        text_child(&mut channel, "geo:lat", "40.7");
        let mut meta = meta_for(Dialect::Rss);
        extract(&RssStrategy, &channel, &mut meta, false);
        assert_eq!(
            meta.extra.get("rss:ttl"),
            Some(&TagValue::Text("60".to_string()))
        );
        assert_eq!(
            meta.extra.get("geo:lat"),
            Some(&TagValue::Text("40.7".to_string()))
        );
    }
}
