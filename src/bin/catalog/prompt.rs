//! Interactive console input.

use std::io::{self, Write};

use anyhow::{Context, Result};
use colored::Colorize;

use movie_catalog::movie::MovieRecord;
use movie_catalog::resolver::{Decision, DecisionProvider};

/// Asks the user on the console which search result is the right one.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl DecisionProvider for ConsolePrompt {
    fn decide(&mut self, file_name: &str, query: &str, candidates: &[MovieRecord]) -> Result<Decision> {
        if candidates.is_empty() {
            println!(
                "  {} \"{}\" ({})",
                "No results for".yellow(),
                query,
                file_name.dimmed()
            );
            let input = read_non_empty_line("  Enter a title to search again, or 0 to skip:")?;
            return Ok(if input == "0" {
                Decision::Skip
            } else {
                Decision::Requery(input)
            });
        }

        println!("  {} \"{}\" ({})", "Multiple results for".cyan(), query, file_name.dimmed());
        for (number, candidate) in candidates.iter().enumerate() {
            println!("  {}: {candidate}", (number + 1).to_string().bold());
        }
        let input = read_non_empty_line("  Select a number, type a new title, or 0 to skip:")?;
        Ok(parse_selection(&input))
    }
}

/// Ask for the movie directory.
pub fn ask_directory() -> Result<String> {
    read_non_empty_line("Movie directory:")
}

/// Interpret a selection answer. Numbers select, anything else is a new search.
fn parse_selection(input: &str) -> Decision {
    input
        .parse::<usize>()
        .map_or_else(|_| Decision::Requery(input.to_string()), Decision::Select)
}

/// Print the prompt and read lines until a non-empty one is given.
fn read_non_empty_line(prompt: &str) -> Result<String> {
    loop {
        print!("{} ", prompt.bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let bytes = io::stdin().read_line(&mut input).context("Failed to read input")?;
        if bytes == 0 {
            anyhow::bail!("Input closed");
        }

        let input = input.trim();
        if !input.is_empty() {
            return Ok(input.to_string());
        }
    }
}
