pub mod cache;
pub mod catalog;
pub mod config;
pub mod inventory;
pub mod kinopoisk;
pub mod movie;
pub mod poster;
pub mod report;
pub mod resolver;

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::Shell;
use colored::Colorize;
use difference::{Changeset, Difference};
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Characters that are not allowed in file names on at least one common platform.
const ILLEGAL_FILENAME_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

/// Get filename from Path with special characters retained instead of decomposed.
pub fn get_normalized_file_name_and_extension(path: &Path) -> Result<(String, String)> {
    let file_stem = os_str_to_string(path.file_stem().context("Failed to get file stem")?);
    let file_extension = os_str_to_string(path.extension().unwrap_or_default());

    // Rust uses Unicode NFD (Normalization Form Decomposed) by default on some platforms,
    // which converts special chars like "å" to "a\u{30a}".
    // Use NFC (Normalization Form Composed) so cache keys match what the user typed.
    Ok((
        file_stem.nfc().collect::<String>(),
        file_extension.nfc().collect::<String>(),
    ))
}

/// Check if entry is a hidden file or directory (starts with '.')
#[must_use]
pub fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    let name_bytes = entry.file_name().as_encoded_bytes();
    !name_bytes.is_empty() && name_bytes[0] == b'.'
}

/// Remove characters that are illegal in file names and collapse whitespace.
///
/// ```rust
/// use movie_catalog::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name(r#"Film: The "Great" One?"#), "Film The Great One");
/// assert_eq!(sanitize_file_name("AC/DC  Live"), "ACDC Live");
/// ```
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c) && !c.is_control())
        .collect();

    RE_WHITESPACE.replace_all(cleaned.trim(), " ").to_string()
}

/// Collapse consecutive whitespace into single spaces and trim both ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").to_string()
}

/// Find the first free path by appending a running index in parentheses to the file stem.
///
/// ```rust
/// use std::path::Path;
/// use movie_catalog::get_incremented_path;
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::File::create(dir.path().join("Heat (1995).mkv")).unwrap();
///
/// let path = get_incremented_path(&dir.path().join("Heat (1995).mkv")).unwrap();
/// assert_eq!(path.file_name().unwrap(), "Heat (1995) (2).mkv");
/// ```
pub fn get_incremented_path(original: &Path) -> Result<PathBuf> {
    let mut index = 2;
    let parent = original.parent().unwrap_or_else(|| Path::new(""));
    let (name, extension) = get_normalized_file_name_and_extension(original)?;
    loop {
        let file_name = if extension.is_empty() {
            format!("{name} ({index})")
        } else {
            format!("{name} ({index}).{extension}")
        };
        let new_path = parent.join(file_name);
        if !new_path.exists() {
            return Ok(new_path);
        }
        index += 1;
    }
}

/// Resolves the provided input path to a directory or file to an absolute path.
///
/// If `path` is `None` or an empty string, the current working directory is used.
/// The function verifies that the provided path exists and is accessible,
/// returning an error if it does not.
///
/// ```rust
/// use movie_catalog::resolve_input_path_str;
///
/// let absolute_path = resolve_input_path_str(Some("src")).unwrap();
/// assert!(absolute_path.is_absolute());
/// ```
#[inline]
pub fn resolve_input_path_str(path: Option<&str>) -> Result<PathBuf> {
    let input_path = path.unwrap_or_default().trim().to_string();
    let filepath = if input_path.is_empty() {
        env::current_dir().context("Failed to get current working directory")?
    } else {
        PathBuf::from(input_path)
    };
    if !filepath.exists() {
        anyhow::bail!(
            "Input path does not exist or is not accessible: '{}'",
            filepath.display()
        );
    }

    let absolute_input_path = dunce::canonicalize(&filepath)?;

    // Canonicalize fails for network drives on Windows :(
    if path_to_string(&absolute_input_path).starts_with(r"\\?") && !path_to_string(&filepath).starts_with(r"\\?") {
        Ok(filepath)
    } else {
        Ok(absolute_input_path)
    }
}

/// Convert `OsStr` to String with invalid Unicode handling.
pub fn os_str_to_string(name: &OsStr) -> String {
    name.to_str().map_or_else(
        || name.to_string_lossy().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to string with invalid Unicode handling.
pub fn path_to_string(path: &Path) -> String {
    path.to_str().map_or_else(
        || path.to_string_lossy().to_string().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to filename string with invalid Unicode handling.
#[must_use]
pub fn path_to_filename_string(path: &Path) -> String {
    os_str_to_string(path.file_name().unwrap_or_default())
}

/// Format a number of minutes as hours and minutes, for example `2h 0m`.
#[must_use]
pub fn format_minutes(minutes: u64) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

/// Color the removed parts of `old` red and the added parts of `new` green.
///
/// One of the lines is indented so the first shared part of at least three characters lines up:
///
/// ```text
///     Matrix.1999.mkv
/// The Matrix (1999).mkv
/// ```
#[must_use]
pub fn rename_diff(old: &str, new: &str) -> (String, String) {
    let changeset = Changeset::new(old, new, "");
    let anchor = changeset.diffs.iter().find_map(|diff| match diff {
        Difference::Same(text) if text.trim().chars().count() >= 3 => old.find(text.as_str()).zip(new.find(text.as_str())),
        _ => None,
    });
    let (mut old_line, mut new_line) = anchor.map_or_else(
        || (String::new(), String::new()),
        |(old_index, new_index)| {
            (
                " ".repeat(new_index.saturating_sub(old_index)),
                " ".repeat(old_index.saturating_sub(new_index)),
            )
        },
    );

    for diff in &changeset.diffs {
        match diff {
            Difference::Same(text) => {
                old_line.push_str(text);
                new_line.push_str(text);
            }
            Difference::Add(text) if text.trim().is_empty() => new_line.push_str(&text.on_green().to_string()),
            Difference::Add(text) => new_line.push_str(&text.green().to_string()),
            Difference::Rem(text) if text.trim().is_empty() => old_line.push_str(&text.on_red().to_string()),
            Difference::Rem(text) => old_line.push_str(&text.red().to_string()),
        }
    }
    (old_line, new_line)
}

/// Print the old and new file name as a stacked diff.
pub fn show_diff(old: &str, new: &str) {
    let (old_line, new_line) = rename_diff(old, new);
    println!("{old_line}");
    println!("{new_line}");
}

/// Install a shell completion script for the binary into the user's completion directory.
///
/// # Errors
/// Returns an error for shells without a known completion directory or if writing fails.
pub fn generate_shell_completion(shell: Shell, mut command: Command, command_name: &str) -> Result<()> {
    let home = dirs::home_dir().context("Failed to get home directory")?;
    let dir = match shell {
        Shell::Bash => home.join(".bash_completion.d"),
        Shell::Fish => home.join(".config/fish/completions"),
        Shell::Zsh => home.join(".zsh/completions"),
        _ => anyhow::bail!("Unsupported shell for completion install: {shell}"),
    };
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let path = clap_complete::generate_to(shell, &mut command, command_name, &dir)?;
    println!("Completion file generated to: {}", path.display());
    Ok(())
}
