use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::app::{Result, RunnelError};
use crate::domain::{Article, FeedMeta};
use crate::parser::{ParserOptions, Record, Records};

fn open_source(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

pub fn parse(path: Option<&Path>, options: ParserOptions, json: bool) -> Result<()> {
    let source = open_source(path)?;
    let mut articles = 0usize;
    let mut errors = 0usize;

    for record in Records::new(source, options) {
        match record {
            Ok(Record::Meta(meta)) => print_meta(&meta, json)?,
            Ok(Record::Article(article)) => {
                articles += 1;
                print_article(&article, json)?;
            }
            Ok(Record::Raw(node)) => {
                if json {
                    println!("{}", serde_json::to_string(&node)?);
                } else {
                    println!("{}", serde_json::to_string_pretty(&node)?);
                }
            }
            Err(err @ RunnelError::NotAFeed) => return Err(err),
            Err(err) => {
                errors += 1;
                warn!(%err, "parse error");
            }
        }
    }

    if !json {
        println!("{} articles, {} errors", articles, errors);
    }
    Ok(())
}

pub fn meta(path: Option<&Path>, options: ParserOptions, json: bool) -> Result<()> {
    let source = open_source(path)?;
    for record in Records::new(source, options) {
        if let Record::Meta(meta) = record? {
            return print_meta(&meta, json);
        }
    }
    Err(RunnelError::Other(
        "document ended before any metadata".to_string(),
    ))
}

fn print_meta(meta: &FeedMeta, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(&serde_json::json!({ "type": "meta", "meta": meta }))?
        );
        return Ok(());
    }
    println!("{} [{} {}]", meta.display_title(), meta.dialect, meta.version);
    if let Some(link) = &meta.link {
        println!("  {}", link);
    }
    if let Some(description) = &meta.description {
        println!("  {}", description);
    }
    Ok(())
}

fn print_article(article: &Article, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(&serde_json::json!({ "type": "article", "article": article }))?
        );
        return Ok(());
    }
    let date = article
        .pubdate
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "          ".to_string());
    println!("{} {}", date, article.display_title());
    if let Some(link) = &article.link {
        println!("  {}", link);
    }
    Ok(())
}
