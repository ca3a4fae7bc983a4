pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "runnel")]
#[command(about = "A streaming RSS/Atom/RDF feed parser", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a feed document and print every record
    Parse {
        /// Path to the feed document (stdin when omitted)
        path: Option<std::path::PathBuf>,

        /// Print records as JSON lines
        #[arg(long)]
        json: bool,

        /// URL the document was fetched from, used to resolve relative links
        #[arg(long)]
        feed_url: Option<String>,

        /// Emit the raw tag tree instead of normalized records
        #[arg(long)]
        raw: bool,

        /// Strip markup from title/description/summary fields
        #[arg(long)]
        strip_html: bool,

        /// Keep going after recoverable XML errors
        #[arg(long)]
        resume: bool,
    },
    /// Print feed-level metadata only
    Meta {
        /// Path to the feed document (stdin when omitted)
        path: Option<std::path::PathBuf>,

        /// Print metadata as JSON
        #[arg(long)]
        json: bool,

        /// URL the document was fetched from, used to resolve relative links
        #[arg(long)]
        feed_url: Option<String>,
    },
}
