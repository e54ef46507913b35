//! mcat - Match movie files to Kinopoisk records and build an HTML catalog.
//!
//! Each video file in the target directory is looked up from the Kinopoisk search API,
//! renamed to `Title (Year).ext` and recorded in a local cache,
//! so later runs only need to look up new files.

mod catalog;
mod config;
mod logger;
mod prompt;
mod stats;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use crate::catalog::MovieCatalog;

/// Match movie files to Kinopoisk records and build an HTML catalog.
///
/// Searches Kinopoisk for every video file in the given directory,
/// asks which movie is meant when the search is ambiguous,
/// renames files to `Title (Year).ext`,
/// downloads posters, and writes a filterable HTML catalog page.
#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Match movie files to Kinopoisk records and build an HTML catalog"
)]
pub struct CatalogArgs {
    /// Movie directory. Asked interactively if not given.
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<String>,

    /// Kinopoisk API key [default: KINOPOISK_API_KEY env variable]
    #[arg(short = 'k', long, name = "KEY")]
    api_key: Option<String>,

    /// Skip ambiguous files instead of asking
    #[arg(short = 'n', long)]
    non_interactive: bool,

    /// Do not download posters
    #[arg(short = 's', long)]
    skip_posters: bool,

    /// Output HTML file name or path
    #[arg(short = 'o', long, name = "FILE")]
    output: Option<String>,

    /// Install shell completion for bash, fish or zsh
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CatalogArgs::parse();

    // Handle shell completion generation
    if let Some(ref shell) = args.completion {
        movie_catalog::generate_shell_completion(*shell, CatalogArgs::command(), env!("CARGO_BIN_NAME"))
    } else {
        MovieCatalog::new(args)?.run().await
    }
}
