use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use runnel::cli::{commands, Cli, Commands};
use runnel::parser::ParserOptions;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            path,
            json,
            feed_url,
            raw,
            strip_html,
            resume,
        } => {
            let options = ParserOptions {
                normalize: !raw,
                feed_url,
                strip_html,
                resume_on_recoverable: resume,
                ..ParserOptions::default()
            };
            commands::parse(path.as_deref(), options, json)?;
        }
        Commands::Meta {
            path,
            json,
            feed_url,
        } => {
            let options = ParserOptions {
                feed_url,
                ..ParserOptions::default()
            };
            commands::meta(path.as_deref(), options, json)?;
        }
    }

    Ok(())
}
