//! The streaming driver: feeds scanner events through the tree builder
//! and emits normalized records as soon as their subtree closes.
//!
//! Feed-level metadata goes out exactly once per document, either when
//! the first item/entry closes or when the channel/feed element closes,
//! whichever comes first. Items never wait for the document to finish.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::app::{Result, RunnelError};
use crate::domain::{Article, FeedMeta, XmlDecl};
use crate::normalizer::{self, item, meta, DialectStrategy};
use crate::scanner::{OpenTag, ScanEvent, Scanner};
use crate::tree::{NodeBuilder, TagNode};
use crate::util;

/// Default cap on accumulated character data per element.
const DEFAULT_MAX_TEXT: usize = 4 * 1024 * 1024;

/// Knobs for one parse. The defaults match what a feed aggregator wants:
/// normalize everything, stop at the first syntax error.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Emit normalized [`Record::Meta`]/[`Record::Article`] records. When
    /// off, the document comes back as a single raw tag tree.
    pub normalize: bool,
    /// Attach a copy of the feed metadata to every article.
    pub add_meta_to_articles: bool,
    /// The URL the document was fetched from; used as the resolution base
    /// until the feed declares its own, and as the `xml_url` fallback.
    pub feed_url: Option<String>,
    /// Strip markup from title/description/summary fields.
    pub strip_html: bool,
    /// Keep going after recoverable XML syntax errors instead of stopping
    /// at the first one.
    pub resume_on_recoverable: bool,
    /// Cap on accumulated character data per element, in bytes.
    pub max_text_length: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            normalize: true,
            add_meta_to_articles: false,
            feed_url: None,
            strip_html: false,
            resume_on_recoverable: false,
            max_text_length: DEFAULT_MAX_TEXT,
        }
    }
}

/// One output record from a streaming parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Meta(FeedMeta),
    Article(Box<Article>),
    /// The whole document tree, emitted instead of normalized records
    /// when normalization is off.
    Raw(TagNode),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DriverState {
    Init,
    InDocument,
    Failed,
    Ended,
}

/// Per-document driver state. Consumes scanner events, produces records.
struct Session {
    options: ParserOptions,
    state: DriverState,
    builder: NodeBuilder,
    strategy: Option<&'static dyn DialectStrategy>,
    meta: Option<FeedMeta>,
    meta_emitted: bool,
    xml_decl: Option<XmlDecl>,
    out: VecDeque<Record>,
}

impl Session {
    fn new(options: ParserOptions) -> Self {
        let builder = {
            let mut builder = NodeBuilder::new(options.max_text_length);
            if let Some(url) = &options.feed_url {
                builder.seed_base(url.clone());
            }
            builder
        };
        Session {
            options,
            state: DriverState::Init,
            builder,
            strategy: None,
            meta: None,
            meta_emitted: false,
            xml_decl: None,
            out: VecDeque::new(),
        }
    }

    fn handle(&mut self, event: ScanEvent) -> Result<()> {
        if matches!(self.state, DriverState::Failed | DriverState::Ended) {
            return Ok(());
        }
        match event {
            ScanEvent::Declaration(decl) => {
                self.xml_decl = Some(decl);
                Ok(())
            }
            ScanEvent::Open(tag) => {
                if self.builder.depth() == 0 && self.strategy.is_none() {
                    self.open_root(tag)
                } else {
                    self.builder.open_tag(tag);
                    Ok(())
                }
            }
            ScanEvent::Text(text) => {
                self.builder.text(&text);
                Ok(())
            }
            ScanEvent::Close(name) => self.close(&name),
            ScanEvent::End => {
                if self.strategy.is_none() {
                    self.state = DriverState::Failed;
                    return Err(RunnelError::NotAFeed);
                }
                self.state = DriverState::Ended;
                Ok(())
            }
        }
    }

    /// Classify the root element, or fail the whole document.
    fn open_root(&mut self, tag: OpenTag) -> Result<()> {
        let Some(detected) = normalizer::detect(&tag) else {
            warn!(root = %tag.name, "unrecognized root element");
            self.state = DriverState::Failed;
            return Err(RunnelError::NotAFeed);
        };
        debug!(dialect = %detected.dialect, version = %detected.version, "detected feed dialect");
        let mut meta = FeedMeta::new(detected.dialect, detected.version);
        meta.xml_decl = self.xml_decl.take();
        for (name, value) in &tag.attributes {
            if name == "xmlns" || name.starts_with("xmlns:") {
                meta.namespaces.push((name.clone(), value.clone()));
            } else if name != "version" {
                meta.root_attrs.push((name.clone(), value.clone()));
            }
        }
        self.strategy = Some(normalizer::strategy(detected.dialect));
        self.meta = Some(meta);
        self.state = DriverState::InDocument;
        self.builder.open_tag(tag);
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<()> {
        let closed = self
            .builder
            .close_tag(name)
            .map_err(RunnelError::scan)?;
        let Some(strategy) = self.strategy else {
            return Ok(());
        };

        if !self.options.normalize {
            if closed.is_root {
                self.out.push_back(Record::Raw(closed.value.into_node(&closed.name)));
            }
            return Ok(());
        }

        match closed.name.as_str() {
            "item" | "entry" => {
                self.emit_meta_from_parent(strategy);
                let mut node = closed.value.into_node(&closed.name);
                if let Some(base) = self.builder.base() {
                    util::reresolve(&mut node, base);
                }
                let mut article = item::extract(strategy, &node, self.options.strip_html);
                if let Some(meta) = &self.meta {
                    if article.author.is_none() {
                        article.author = meta.author.clone();
                    }
                    if self.options.add_meta_to_articles {
                        article.meta = Some(Box::new(meta.clone()));
                    }
                }
                // A source URL can establish the base for later items the
                // same way a self link would.
                if !self.builder.has_base() {
                    if let Some(url) = &article.source.url {
                        self.builder.seed_base(url.clone());
                    }
                }
                self.out.push_back(Record::Article(Box::new(article)));
            }
            "channel" | "feed" => {
                if !self.meta_emitted {
                    let mut node = closed.value.into_node(&closed.name);
                    self.emit_meta(strategy, &mut node);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Emit metadata from the still-open channel/feed element, for
    /// documents where the first item closes before its container does.
    fn emit_meta_from_parent(&mut self, strategy: &'static dyn DialectStrategy) {
        if self.meta_emitted {
            return;
        }
        let Some(mut parent) = self.builder.top_mut().map(|p| p.clone()) else {
            return;
        };
        self.emit_meta(strategy, &mut parent);
    }

    /// Finish and emit the one metadata record. A `self` link discovered
    /// here can establish the resolution base late, in which case the
    /// whole subtree built so far is re-resolved against it.
    fn emit_meta(&mut self, strategy: &'static dyn DialectStrategy, node: &mut TagNode) {
        self.meta_emitted = true;
        if !self.builder.has_base() {
            if let Some(url) = self_link(node) {
                debug!(url = %url, "late resolution base from self link");
                self.builder.seed_base(url);
            }
        }
        if let Some(base) = self.builder.base() {
            util::reresolve(node, base);
        }
        let Some(mut meta) = self.meta.take() else {
            return;
        };
        meta::extract(strategy, node, &mut meta, self.options.strip_html);
        if meta.xml_url.is_none() {
            meta.xml_url = self.options.feed_url.clone();
        }
        self.out.push_back(Record::Meta(meta.clone()));
        self.meta = Some(meta);
    }
}

/// First `rel="self"` link URL in a channel/feed node, if any.
fn self_link(node: &TagNode) -> Option<String> {
    node.children_named("link")
        .find(|link| link.attr("rel") == Some("self"))
        .and_then(|link| link.attr("href"))
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}

/// Streaming record iterator over a buffered reader. Recoverable scanner
/// errors are yielded as `Err` items; with `resume_on_recoverable` set
/// the iterator keeps producing records afterwards.
pub struct Records<R: BufRead> {
    scanner: Scanner<R>,
    session: Session,
    finished: bool,
}

impl<R: BufRead> Records<R> {
    pub fn new(source: R, options: ParserOptions) -> Self {
        Records {
            scanner: Scanner::new(source),
            session: Session::new(options),
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.session.out.pop_front() {
                return Some(Ok(record));
            }
            if self.finished {
                return None;
            }
            match self.scanner.next_event() {
                Ok(Some(event)) => {
                    let at_end = matches!(event, ScanEvent::End);
                    if let Err(err) = self.session.handle(event) {
                        let resumable = matches!(err, RunnelError::Scan { .. })
                            && self.session.options.resume_on_recoverable;
                        if !resumable {
                            self.finished = true;
                        }
                        return Some(Err(err));
                    }
                    if at_end {
                        self.finished = true;
                    }
                }
                Ok(None) => self.finished = true,
                Err(scan) => {
                    if scan.fatal || !self.session.options.resume_on_recoverable {
                        self.finished = true;
                    }
                    return Some(Err(RunnelError::scan(scan.message)));
                }
            }
        }
    }
}

/// Everything a one-shot parse produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    pub meta: Option<FeedMeta>,
    pub articles: Vec<Article>,
    /// Raw document trees, populated only when normalization is off.
    pub raw: Vec<TagNode>,
}

/// Parse a whole document from a buffered reader. Recoverable syntax
/// errors are collected; if any occurred, the last one is returned with
/// the earlier messages attached.
pub fn parse_reader<R: BufRead>(source: R, options: ParserOptions) -> Result<Parsed> {
    let mut parsed = Parsed::default();
    let mut errors: Vec<String> = Vec::new();
    for record in Records::new(source, options) {
        match record {
            Ok(Record::Meta(meta)) => parsed.meta = Some(meta),
            Ok(Record::Article(article)) => parsed.articles.push(*article),
            Ok(Record::Raw(node)) => parsed.raw.push(node),
            Err(RunnelError::Scan { message, .. }) => errors.push(message),
            Err(other) => return Err(other),
        }
    }
    match errors.pop() {
        Some(message) => Err(RunnelError::Scan {
            message,
            earlier: errors,
        }),
        None => Ok(parsed),
    }
}

pub fn parse_str(source: &str, options: ParserOptions) -> Result<Parsed> {
    parse_reader(source.as_bytes(), options)
}

pub fn parse_file(path: impl AsRef<Path>, options: ParserOptions) -> Result<Parsed> {
    let file = File::open(path)?;
    parse_reader(BufReader::new(file), options)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIFTOFF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Liftoff News</title>
    <link>http://liftoff.msfc.nasa.gov/</link>
    <description>Liftoff to Space Exploration.</description>
    <language>en-us</language>
    <pubDate>Tue, 10 Jun 2003 04:00:00 GMT</pubDate>
    <item>
      <title>Star City</title>
      <link>http://liftoff.msfc.nasa.gov/news/2003/news-starcity.asp</link>
      <description>How do Americans get ready to work with Russians?</description>
      <pubDate>Tue, 03 Jun 2003 09:39:21 GMT</pubDate>
      <guid>http://liftoff.msfc.nasa.gov/2003/06/03.html#item573</guid>
    </item>
    <item>
      <description>Sky watchers in Europe, Asia, and parts of Alaska.</description>
      <pubDate>Fri, 30 May 2003 11:06:42 GMT</pubDate>
      <guid>http://liftoff.msfc.nasa.gov/2003/05/30.html#item572</guid>
    </item>
    <item>
      <title>The Engine That Does More</title>
      <link>http://liftoff.msfc.nasa.gov/news/2003/news-VASIMR.asp</link>
      <description>Before man travels to Mars, NASA hopes to design new engines.</description>
      <pubDate>Tue, 27 May 2003 08:37:32 GMT</pubDate>
      <guid>http://liftoff.msfc.nasa.gov/2003/05/27.html#item571</guid>
    </item>
    <item>
      <title>Astronauts' Dirty Laundry</title>
      <link>http://liftoff.msfc.nasa.gov/news/2003/news-laundry.asp</link>
      <description>Compared to earlier spacecraft, the space station has plenty of room.</description>
      <pubDate>Tue, 20 May 2003 08:56:02 GMT</pubDate>
      <guid>http://liftoff.msfc.nasa.gov/2003/05/20.html#item570</guid>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_liftoff_channel_and_items() {
        let parsed = parse_str(LIFTOFF, ParserOptions::default()).unwrap();
        let meta = parsed.meta.unwrap();
        assert_eq!(meta.title.as_deref(), Some("Liftoff News"));
        assert_eq!(meta.link.as_deref(), Some("http://liftoff.msfc.nasa.gov/"));
        assert_eq!(meta.language.as_deref(), Some("en-us"));
        assert_eq!(meta.version, "2.0");
        assert_eq!(parsed.articles.len(), 4);
        assert_eq!(parsed.articles[0].title.as_deref(), Some("Star City"));
        assert_eq!(parsed.articles[1].title, None);
        assert_eq!(
            parsed.articles[3].title.as_deref(),
            Some("Astronauts' Dirty Laundry")
        );
    }

    #[test]
    fn test_meta_precedes_articles_in_stream() {
        let mut records = Records::new(LIFTOFF.as_bytes(), ParserOptions::default());
        assert!(matches!(records.next(), Some(Ok(Record::Meta(_)))));
        assert!(matches!(records.next(), Some(Ok(Record::Article(_)))));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let first = parse_str(LIFTOFF, ParserOptions::default()).unwrap();
        let second = parse_str(LIFTOFF, ParserOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_xml_declaration_captured() {
        let parsed = parse_str(LIFTOFF, ParserOptions::default()).unwrap();
        let decl = parsed.meta.unwrap().xml_decl.unwrap();
        assert_eq!(decl.version.as_deref(), Some("1.0"));
        assert_eq!(decl.encoding.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_atom_entries_and_base_resolution() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom" xml:base="http://example.org/">
  <title>dive into mark</title>
  <link rel="self" href="/feed.atom"/>
  <link rel="alternate" href="/"/>
  <updated>2005-07-31T12:29:29Z</updated>
  <entry>
    <title>Atom draft-07 snapshot</title>
    <link rel="alternate" type="text/html" href="/2005/04/atom"/>
    <id>tag:example.org,2003:3.2397</id>
    <updated>2005-07-31T12:29:29Z</updated>
    <author><name>Mark Pilgrim</name></author>
  </entry>
</feed>"#;
        let parsed = parse_str(xml, ParserOptions::default()).unwrap();
        let meta = parsed.meta.unwrap();
        assert_eq!(meta.title.as_deref(), Some("dive into mark"));
        assert_eq!(meta.link.as_deref(), Some("http://example.org/"));
        assert_eq!(meta.xml_url.as_deref(), Some("http://example.org/feed.atom"));
        assert_eq!(parsed.articles.len(), 1);
        let article = &parsed.articles[0];
        assert_eq!(article.link.as_deref(), Some("http://example.org/2005/04/atom"));
        assert_eq!(article.guid.as_deref(), Some("tag:example.org,2003:3.2397"));
        assert_eq!(article.author.as_deref(), Some("Mark Pilgrim"));
    }

    #[test]
    fn test_late_base_from_self_link() {
        // No xml:base anywhere; the self link alone establishes the base
        // and already-built relative URLs get re-resolved against it.
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Intertwingly</title>
  <link rel="alternate" href="/blog/"/>
  <link rel="self" href="http://intertwingly.net/blog/index.atom"/>
  <entry>
    <title>hello</title>
    <link rel="alternate" href="/blog/2006/1.html"/>
  </entry>
</feed>"#;
        let parsed = parse_str(xml, ParserOptions::default()).unwrap();
        let meta = parsed.meta.unwrap();
        assert_eq!(meta.link.as_deref(), Some("http://intertwingly.net/blog/"));
        assert_eq!(
            parsed.articles[0].link.as_deref(),
            Some("http://intertwingly.net/blog/2006/1.html")
        );
    }

    #[test]
    fn test_feed_url_option_seeds_base() {
        let xml = r#"<rss version="2.0"><channel>
  <title>t</title>
  <link>/blog/</link>
  <item><title>a</title><link>/blog/post-1</link></item>
</channel></rss>"#;
        let options = ParserOptions {
            feed_url: Some("http://example.com/feed.xml".to_string()),
            ..ParserOptions::default()
        };
        let parsed = parse_str(xml, options).unwrap();
        let meta = parsed.meta.unwrap();
        assert_eq!(meta.link.as_deref(), Some("http://example.com/blog/"));
        assert_eq!(meta.xml_url.as_deref(), Some("http://example.com/feed.xml"));
        assert_eq!(
            parsed.articles[0].link.as_deref(),
            Some("http://example.com/blog/post-1")
        );
    }

    #[test]
    fn test_rdf_dialect() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns="http://purl.org/rss/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel rdf:about="http://example.org/rss">
    <title>XML.com</title>
    <link>http://xml.com/pub</link>
    <description>XML.com features.</description>
    <dc:date>2002-09-04</dc:date>
  </channel>
  <item rdf:about="http://xml.com/pub/2002/12/04/normalizing.html">
    <title>Normalizing XML</title>
    <link>http://xml.com/pub/2002/12/04/normalizing.html</link>
    <dc:creator>Will Provost</dc:creator>
  </item>
</rdf:RDF>"#;
        let parsed = parse_str(xml, ParserOptions::default()).unwrap();
        let meta = parsed.meta.unwrap();
        assert_eq!(meta.dialect, crate::domain::Dialect::Rdf);
        assert_eq!(meta.title.as_deref(), Some("XML.com"));
        assert!(meta.date.is_some());
        assert_eq!(parsed.articles.len(), 1);
        assert_eq!(parsed.articles[0].author.as_deref(), Some("Will Provost"));
    }

    #[test]
    fn test_not_a_feed() {
        let err = parse_str("<html><body>nope</body></html>", ParserOptions::default())
            .unwrap_err();
        assert!(matches!(err, RunnelError::NotAFeed));
    }

    #[test]
    fn test_empty_document_is_not_a_feed() {
        let err = parse_str("", ParserOptions::default()).unwrap_err();
        assert!(matches!(err, RunnelError::NotAFeed));
    }

    #[test]
    fn test_duplicate_guids_kept_in_document_order() {
        let xml = r#"<rss version="2.0"><channel><title>t</title>
  <item><title>first</title><guid>dup</guid></item>
  <item><title>second</title><guid>dup</guid></item>
</channel></rss>"#;
        let parsed = parse_str(xml, ParserOptions::default()).unwrap();
        assert_eq!(parsed.articles.len(), 2);
        assert_eq!(parsed.articles[0].title.as_deref(), Some("first"));
        assert_eq!(parsed.articles[1].title.as_deref(), Some("second"));
        assert_eq!(parsed.articles[0].guid, parsed.articles[1].guid);
    }

    #[test]
    fn test_meta_author_inherited_by_authorless_items() {
        let xml = r#"<rss version="2.0"><channel>
  <title>t</title>
  <managingEditor>ed@example.com (Edna)</managingEditor>
  <item><title>no author here</title></item>
  <item><title>own author</title><dc:creator xmlns:dc="http://purl.org/dc/elements/1.1/">Pat</dc:creator></item>
</channel></rss>"#;
        let parsed = parse_str(xml, ParserOptions::default()).unwrap();
        assert_eq!(parsed.articles[0].author.as_deref(), Some("Edna"));
        assert_eq!(parsed.articles[1].author.as_deref(), Some("Pat"));
    }

    #[test]
    fn test_add_meta_to_articles() {
        let options = ParserOptions {
            add_meta_to_articles: true,
            ..ParserOptions::default()
        };
        let parsed = parse_str(LIFTOFF, options).unwrap();
        let attached = parsed.articles[0].meta.as_ref().unwrap();
        assert_eq!(attached.title.as_deref(), Some("Liftoff News"));
    }

    #[test]
    fn test_raw_mode_returns_document_tree() {
        let options = ParserOptions {
            normalize: false,
            ..ParserOptions::default()
        };
        let parsed = parse_str(LIFTOFF, options).unwrap();
        assert!(parsed.meta.is_none());
        assert!(parsed.articles.is_empty());
        assert_eq!(parsed.raw.len(), 1);
        let root = &parsed.raw[0];
        assert_eq!(root.name, "rss");
        let channel = root.child("channel").and_then(|c| c.as_element()).unwrap();
        assert_eq!(channel.children_named("item").count(), 4);
    }

    #[test]
    fn test_root_namespaces_reported() {
        let xml = r#"<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel><title>t</title></channel></rss>"#;
        let parsed = parse_str(xml, ParserOptions::default()).unwrap();
        let meta = parsed.meta.unwrap();
        assert_eq!(
            meta.namespaces,
            vec![("xmlns:dc".to_string(), "http://purl.org/dc/elements/1.1/".to_string())]
        );
    }

    #[test]
    fn test_mismatched_tag_is_scan_error() {
        let err = parse_str(
            "<rss version='2.0'><channel></wrong></channel></rss>",
            ParserOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RunnelError::Scan { .. }));
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.xml");
        std::fs::write(&path, LIFTOFF).unwrap();
        let parsed = parse_file(&path, ParserOptions::default()).unwrap();
        assert_eq!(parsed.articles.len(), 4);
    }
}
