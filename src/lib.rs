//! # Runnel
//!
//! A streaming RSS 2.0 / Atom / RSS 1.0 (RDF) feed parser.
//!
//! ## Architecture
//!
//! Runnel follows a streaming pipeline architecture:
//!
//! ```text
//! Scanner → NodeBuilder → Normalizer → Records
//! ```
//!
//! - [`scanner`]: Tokenizing XML layer with namespace-aware canonical names
//! - [`tree`]: Incremental tag-tree construction, xml:base tracking, XHTML capture
//! - [`normalizer`]: Dialect detection plus meta/item flattening
//! - [`parser`]: The driver loop, record stream and one-shot entry points
//!
//! Records come out as soon as their subtree closes: feed metadata once
//! per document, then one article per item/entry, without waiting for
//! the document to finish.
//!
//! ## Quick Start
//!
//! ```no_run
//! use runnel::parser::{parse_file, ParserOptions};
//!
//! let parsed = parse_file("feed.xml", ParserOptions::default())?;
//! if let Some(meta) = &parsed.meta {
//!     println!("{}", meta.display_title());
//! }
//! for article in &parsed.articles {
//!     println!("  {}", article.display_title());
//! }
//! # Ok::<(), runnel::app::RunnelError>(())
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Error types shared across the crate
//! - [`cli`]: Command-line interface definitions
//! - [`domain`]: Normalized output records (FeedMeta, Article, Enclosure)
//! - [`namespace`]: Known namespace URIs and their canonical prefixes
//! - [`scanner`]: XML event scanning
//! - [`tree`]: Tag-tree building
//! - [`normalizer`]: Dialect-aware normalization
//! - [`parser`]: Streaming and one-shot parse surfaces

/// Error handling.
///
/// [`RunnelError`](app::RunnelError) covers the whole pipeline; the
/// crate-wide [`Result`](app::Result) alias uses it.
pub mod app;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `parse [path]` - Parse a document and print every record
/// - `meta [path]` - Print feed-level metadata only
pub mod cli;

/// Normalized output records.
///
/// - [`FeedMeta`](domain::FeedMeta): Feed-level metadata, one per document
/// - [`Article`](domain::Article): One normalized item/entry
/// - [`Enclosure`](domain::Enclosure): Media attachments, coalesced per resource
pub mod domain;

/// Known namespace URIs mapped to canonical prefixes.
pub mod namespace;

/// Dialect detection and normalization.
///
/// Flattens RSS 0.9x/1.0/2.0 and Atom 0.3/1.0 tag trees into the
/// unified [`domain`] records.
pub mod normalizer;

/// The streaming driver.
///
/// - [`Records`](parser::Records): Iterator of records over any `BufRead`
/// - [`parse_str`](parser::parse_str) / [`parse_file`](parser::parse_file):
///   One-shot entry points collecting everything into a [`Parsed`](parser::Parsed)
pub mod parser;

/// XML event scanning over quick-xml, with canonicalized names.
pub mod scanner;

/// The dialect-agnostic tag tree and its incremental builder.
pub mod tree;

/// Shared helpers: URL resolution, date parsing, mailbox parsing,
/// HTML stripping.
pub mod util;
