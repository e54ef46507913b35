//! Video file discovery and filename rules.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use walkdir::WalkDir;

/// Pattern for a file that has already been renamed to the canonical `Title (YYYY).ext` form.
/// Collision copies such as `Title (YYYY) (2).ext` match too.
pub const CANONICAL_PATTERN: &str = r"^.+ \(\d{4}\)( \(\d+\))?\.[A-Za-z0-9]{2,4}$";

/// Copy index appended after the year on rename collisions.
static RE_COPY_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+ \(\d{4}\)) \(\d+\)$").expect("Failed to compile copy index regex"));

/// Stem suffix marking a file as manually fixed, for example `Some.Movie.fixed.mkv`.
pub const FIXED_MARKER: &str = "fixed";

/// Video file extensions included by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "wmv", "stub", "m4v"];

/// Rules for recognising files that are already resolved.
#[derive(Debug, Clone)]
pub struct NamingRules {
    canonical: Regex,
    fixed_marker: String,
}

/// A video file inside the catalog directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    /// Full path to the file.
    pub path: PathBuf,
    /// File name with extension exactly as on disk. This is the cache key.
    pub file_name: String,
    /// File name without extension, NFC normalized.
    pub stem: String,
    /// Extension without the dot, original case.
    pub extension: String,
    /// File needs no disambiguation prompt and no rename.
    pub already_canonical: bool,
}

impl NamingRules {
    /// Create rules with a custom canonical pattern and marker.
    ///
    /// # Errors
    /// Returns an error if the pattern is not a valid regex.
    pub fn new(canonical_pattern: &str, fixed_marker: &str) -> Result<Self> {
        let canonical = Regex::new(canonical_pattern)
            .with_context(|| format!("Invalid canonical filename pattern: {canonical_pattern}"))?;
        Ok(Self {
            canonical,
            fixed_marker: fixed_marker.trim().trim_start_matches('.').to_string(),
        })
    }

    /// Check if the full file name matches the canonical `Title (YYYY).ext` pattern.
    #[must_use]
    pub fn is_canonical(&self, file_name: &str) -> bool {
        self.canonical.is_match(file_name)
    }

    /// Check if the stem ends with the fixed marker, for example `Name.fixed`.
    #[must_use]
    pub fn has_fixed_marker(&self, stem: &str) -> bool {
        !self.fixed_marker.is_empty()
            && stem
                .rsplit_once('.')
                .is_some_and(|(_, last)| last == self.fixed_marker)
    }

    /// A file counts as already resolved if it matches the canonical pattern
    /// or carries the fixed marker.
    ///
    /// Resolved files take the first search result without asking and are never renamed.
    #[must_use]
    pub fn is_already_resolved(&self, file_name: &str, stem: &str) -> bool {
        self.is_canonical(file_name) || self.has_fixed_marker(stem)
    }

    /// Build the search query for a file stem.
    ///
    /// The fixed marker and a collision copy index are removed,
    /// and dot and underscore separators become spaces.
    #[must_use]
    pub fn search_query(&self, stem: &str) -> String {
        let stem = if self.has_fixed_marker(stem) {
            stem.rsplit_once('.').map_or(stem, |(name, _)| name)
        } else {
            stem
        };
        let stem = RE_COPY_INDEX
            .captures(stem)
            .and_then(|captures| captures.get(1))
            .map_or(stem, |base| base.as_str());
        normalize_query(stem)
    }
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            canonical: Regex::new(CANONICAL_PATTERN).expect("Failed to compile canonical filename regex"),
            fixed_marker: FIXED_MARKER.to_string(),
        }
    }
}

impl VideoFile {
    /// Create a video file from a path.
    ///
    /// # Errors
    /// Returns an error if the path has no file name.
    pub fn new(path: &Path, rules: &NamingRules) -> Result<Self> {
        let (stem, extension) = crate::get_normalized_file_name_and_extension(path)?;
        let normalized_name = if extension.is_empty() {
            stem.clone()
        } else {
            format!("{stem}.{extension}")
        };
        let already_canonical = rules.is_already_resolved(&normalized_name, &stem);
        let file_name = crate::path_to_filename_string(path);
        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            stem,
            extension,
            already_canonical,
        })
    }

    /// Extension with leading dot, or an empty string.
    #[must_use]
    pub fn dotted_extension(&self) -> String {
        if self.extension.is_empty() {
            String::new()
        } else {
            format!(".{}", self.extension)
        }
    }
}

/// Normalize a title for searching: dots and underscores become spaces and whitespace is collapsed.
///
/// ```rust
/// use movie_catalog::inventory::normalize_query;
///
/// assert_eq!(normalize_query("Matrix.1999"), "Matrix 1999");
/// assert_eq!(normalize_query("  the_big.lebowski "), "the big lebowski");
/// ```
#[must_use]
pub fn normalize_query(text: &str) -> String {
    crate::collapse_whitespace(&text.replace(['.', '_'], " "))
}

/// Gather the video files directly inside `root`, sorted by file name.
///
/// Hidden files and directories are skipped.
/// Extensions are compared case-insensitively against the given allowlist.
///
/// # Errors
/// Returns an error if the directory cannot be read.
pub fn gather_video_files(root: &Path, extensions: &[String], rules: &NamingRules) -> Result<Vec<VideoFile>> {
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_entry(|e| !crate::is_hidden(e))
    {
        let entry = entry.with_context(|| format!("Failed to read directory: {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if is_video_file(path, extensions) {
            files.push(VideoFile::new(path, rules)?);
        }
    }

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(files)
}

fn is_video_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|allowed| *allowed == ext))
}


#[cfg(test)]
mod gather_video_files_tests {
    use super::*;

    use std::fs::{self, File};

    use tempfile::TempDir;

    fn extensions() -> Vec<String> {
        DEFAULT_EXTENSIONS.iter().map(|ext| (*ext).to_string()).collect()
    }

    #[test]
    fn finds_video_files_by_extension() {
        let dir = TempDir::new().unwrap();
        for name in ["b.mkv", "a.MP4", "notes.txt", "c.m4v", "poster.jpg"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let files = gather_video_files(dir.path(), &extensions(), &NamingRules::default()).unwrap();
        let names: Vec<&str> = files.iter().map(|file| file.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.MP4", "b.mkv", "c.m4v"]);
    }

    #[test]
    fn skips_hidden_entries_and_subdirectories() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join(".hidden.mkv")).unwrap();
        fs::create_dir(dir.path().join(".posters")).unwrap();
        File::create(dir.path().join(".posters").join("x.mkv")).unwrap();
        fs::create_dir(dir.path().join("Extras")).unwrap();
        File::create(dir.path().join("Extras").join("bonus.mkv")).unwrap();
        File::create(dir.path().join("Movie.mkv")).unwrap();

        let files = gather_video_files(dir.path(), &extensions(), &NamingRules::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "Movie.mkv");
    }

    #[test]
    fn video_file_attributes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("The Matrix (1999).MKV");
        File::create(&path).unwrap();

        let file = VideoFile::new(&path, &NamingRules::default()).unwrap();
        assert_eq!(file.file_name, "The Matrix (1999).MKV");
        assert_eq!(file.stem, "The Matrix (1999)");
        assert_eq!(file.extension, "MKV");
        assert_eq!(file.dotted_extension(), ".MKV");
        assert!(file.already_canonical);
    }

    #[test]
    fn decomposed_name_is_kept_as_on_disk() {
        let dir = TempDir::new().unwrap();
        let on_disk = "Мои\u{306}.Фильм.mkv";
        let path = dir.path().join(on_disk);
        File::create(&path).unwrap();

        let file = VideoFile::new(&path, &NamingRules::default()).unwrap();
        assert_eq!(file.file_name, on_disk);
        assert_eq!(file.stem, "Мой.Фильм");
        assert_eq!(NamingRules::default().search_query(&file.stem), "Мой Фильм");
        assert_eq!(file.path, path);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(gather_video_files(&missing, &extensions(), &NamingRules::default()).is_err());
    }
}
