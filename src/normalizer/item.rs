//! Flattens a closed item/entry tag node into an [`Article`] record.

use crate::domain::{Article, Enclosure};
use crate::normalizer::{collect_categories, passthrough_key, DialectStrategy};
use crate::tree::{TagNode, TagValue};
use crate::util;

const RECOGNIZED: &[&str] = &[
    "title",
    "description",
    "summary",
    "content",
    "content:encoded",
    "pubdate",
    "published",
    "issued",
    "modified",
    "updated",
    "dc:date",
    "link",
    "guid",
    "id",
    "author",
    "dc:creator",
    "comments",
    "source",
    "enclosure",
    "category",
    "dc:subject",
    "itunes:category",
    "media:category",
    "itunes:summary",
    "itunes:author",
    "itunes:owner",
    "itunes:image",
    "dc:publisher",
    "media:content",
    "media:group",
    "media:thumbnail",
    "feedburner:origlink",
    "pheedo:origlink",
];

/// Extract one article from a closed item/entry node. Re-resolution
/// against the base URL has already happened on the node itself.
pub fn extract(strategy: &dyn DialectStrategy, node: &TagNode, strip: bool) -> Article {
    let dialect = strategy.dialect();
    let mut article = Article::default();

    for (name, value) in &node.children {
        match name.as_str() {
            "title" => first_wins(&mut article.title, value.text()),
            "description" | "summary" => {
                if let Some(text) = value.text() {
                    article.summary = Some(text.to_string());
                    if article.description.is_none() {
                        article.description = Some(text.to_string());
                    }
                }
            }
            // Full content always beats whatever description was set.
            "content" | "content:encoded" => {
                if let Some(text) = value.text() {
                    article.description = Some(text.to_string());
                }
            }
            "pubdate" | "published" | "issued" | "modified" | "updated" | "dc:date" => {
                let Some(date) = value.text().and_then(util::parse_date) else {
                    continue;
                };
                if article.pubdate.is_none()
                    || name == "pubdate"
                    || name == "published"
                    || name == "issued"
                {
                    article.pubdate = Some(date);
                }
                if article.date.is_none() || name == "modified" || name == "updated" {
                    article.date = Some(date);
                }
            }
            "link" => {
                if let Some(href) = value.attr("href").filter(|h| !h.is_empty()) {
                    match value.attr("rel") {
                        None | Some("") => first_wins(&mut article.link, Some(href)),
                        Some("alternate") | Some("self") if html_like(value) => {
                            first_wins(&mut article.link, Some(href));
                        }
                        Some("replies") => first_wins(&mut article.comments, Some(href)),
                        Some("enclosure") => article.push_enclosure(Enclosure {
                            url: href.to_string(),
                            mime_type: attr_string(value, "type"),
                            length: attr_string(value, "length"),
                            ..Enclosure::default()
                        }),
                        Some("canonical") => first_wins(&mut article.origlink, Some(href)),
                        _ => {}
                    }
                } else if let Some(text) = value.text() {
                    first_wins(&mut article.link, Some(text));
                }
                // RSS items often carry no guid at all; the link stands in.
                if article.guid.is_none() {
                    article.guid = article.link.clone();
                }
            }
            "guid" => {
                if let Some(text) = value.text() {
                    article.guid = Some(text.to_string());
                    let opted_out = value
                        .attr("ispermalink")
                        .is_some_and(|v| v.eq_ignore_ascii_case("false"));
                    article.permalink = (!opted_out).then(|| text.to_string());
                }
            }
            "id" => {
                if let Some(text) = value.text() {
                    article.guid = Some(text.to_string());
                }
            }
            "author" => {
                if let Some(author) = person(value) {
                    article.author = Some(author);
                }
            }
            "dc:creator" => {
                if let Some(text) = value.text() {
                    article.author = Some(text.to_string());
                }
            }
            "comments" => first_wins(&mut article.comments, value.text()),
            "source" => {
                let source = strategy.source(value);
                if article.source == Default::default() {
                    article.source = source;
                }
            }
            "enclosure" | "media:content" => {
                if let Some(enclosure) = media_enclosure(value) {
                    article.push_enclosure(enclosure);
                }
            }
            "media:group" => {
                if let Some(group) = value.as_element() {
                    for content in group.children_named("media:content") {
                        if let Some(enclosure) = media_enclosure(content) {
                            article.push_enclosure(enclosure);
                        }
                    }
                }
            }
            "feedburner:origlink" | "pheedo:origlink" => {
                if let Some(text) = value.text() {
                    article.origlink = Some(text.to_string());
                }
            }
            _ => {}
        }

        if !RECOGNIZED.contains(&name.as_str()) {
            article
                .extra
                .entry(passthrough_key(dialect, name))
                .or_insert_with(|| value.clone());
        }
    }

    if article.description.is_none() {
        article.description = node.child_text("itunes:summary").map(str::to_string);
    }
    if article.author.is_none() {
        article.author = node
            .child_text("itunes:author")
            .map(str::to_string)
            .or_else(|| {
                node.child("itunes:owner")
                    .and_then(|owner| owner.as_element())
                    .and_then(|owner| owner.child_text("itunes:name"))
                    .map(str::to_string)
            })
            .or_else(|| node.child_text("dc:publisher").map(str::to_string));
    }
    article.image.url = item_image(node);

    article.categories = collect_categories(strategy, &node.children);

    if strip {
        for field in [
            &mut article.title,
            &mut article.description,
            &mut article.summary,
        ] {
            *field = field.take().map(|text| util::strip_html(&text));
        }
    }

    article
}

fn first_wins(slot: &mut Option<String>, candidate: Option<&str>) {
    if slot.is_none() {
        if let Some(candidate) = candidate.filter(|c| !c.is_empty()) {
            *slot = Some(candidate.to_string());
        }
    }
}

/// An alternate/self link counts as the article link only when untyped or
/// typed as some flavor of HTML.
fn html_like(value: &TagValue) -> bool {
    match value.attr("type") {
        None | Some("") => true,
        Some(mime) => mime.contains("html"),
    }
}

fn attr_string(value: &TagValue, name: &str) -> Option<String> {
    value.attr(name).filter(|v| !v.is_empty()).map(str::to_string)
}

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

/// Build an enclosure from `<enclosure>` or `<media:content>` attributes.
fn media_enclosure(value: &TagValue) -> Option<Enclosure> {
    let url = value.attr("url").filter(|u| !u.is_empty())?;
    Some(Enclosure {
        url: url.to_string(),
        mime_type: attr_string(value, "type").or_else(|| attr_string(value, "medium")),
        length: attr_string(value, "length").or_else(|| attr_string(value, "filesize")),
        bitrate: attr_string(value, "bitrate"),
        framerate: attr_string(value, "framerate"),
        samplingrate: attr_string(value, "samplingrate"),
        duration: attr_string(value, "duration"),
        height: attr_string(value, "height"),
        width: attr_string(value, "width"),
    })
}

/// The item image fallback chain: `itunes:image`, then a thumbnail at any
/// of the spots the media extension allows one.
fn item_image(node: &TagNode) -> Option<String> {
    if let Some(href) = node.child("itunes:image").and_then(|i| i.attr("href")) {
        return Some(href.to_string());
    }
    if let Some(url) = thumbnail_url(node.children_named("media:thumbnail")) {
        return Some(url);
    }
    for content in node.children_named("media:content") {
        if let Some(el) = content.as_element() {
            if let Some(url) = thumbnail_url(el.children_named("media:thumbnail")) {
                return Some(url);
            }
        }
    }
    for group in node.children_named("media:group") {
        let Some(group) = group.as_element() else { continue };
        if let Some(url) = thumbnail_url(group.children_named("media:thumbnail")) {
            return Some(url);
        }
        for content in group.children_named("media:content") {
            if let Some(el) = content.as_element() {
                if let Some(url) = thumbnail_url(el.children_named("media:thumbnail")) {
                    return Some(url);
                }
            }
        }
    }
    None
}

fn thumbnail_url<'a>(thumbnails: impl Iterator<Item = &'a TagValue>) -> Option<String> {
    for thumbnail in thumbnails {
        if let Some(url) = thumbnail.attr("url").filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }
    }
    None
}
