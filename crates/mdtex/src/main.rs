//! mdtex CLI - LaTeX snippets in Markdown.
//!
//! Provides commands for:
//! - `preprocess`: Replace LaTeX snippets with inline images, emit Markdown
//! - `html`: Replace LaTeX snippets and render the document to HTML

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{HtmlArgs, PreprocessArgs};
use output::Output;

/// mdtex - Render LaTeX snippets in Markdown as inline images.
#[derive(Parser)]
#[command(name = "mdtex", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace LaTeX snippets with inline images and write Markdown.
    Preprocess(PreprocessArgs),
    /// Replace LaTeX snippets and render the document to HTML.
    Html(HtmlArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Preprocess(args) => args.common.verbose,
            Self::Html(args) => args.common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Preprocess(args) => args.execute(),
        Commands::Html(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbose_flag_per_command() {
        let cli = Cli::try_parse_from(["mdtex", "html", "doc.md", "--verbose"]).unwrap();
        assert!(cli.command.verbose());

        let cli = Cli::try_parse_from(["mdtex", "preprocess", "-"]).unwrap();
        assert!(!cli.command.verbose());
    }
}
