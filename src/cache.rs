//! Persistent lookup cache.
//!
//! Maps the current on-disk file name to the movie record selected for it.
//! The cache is a single JSON object and is replaced atomically on save.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::movie::MovieRecord;
use crate::print_warning;

/// Default cache file name inside the catalog directory.
pub const CACHE_FILENAME: &str = ".movie-catalog.json";

/// File name to movie record mapping backed by a JSON file.
#[derive(Debug, Default)]
pub struct CacheStore {
    path: PathBuf,
    entries: BTreeMap<String, MovieRecord>,
    modified: bool,
}

impl CacheStore {
    /// Create an empty cache that will be saved to the given path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
            modified: false,
        }
    }

    /// Load the cache from the given path.
    ///
    /// A missing file gives an empty cache.
    /// An unreadable or corrupt file is reported and also gives an empty cache,
    /// so a broken cache never stops a run.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let mut cache = Self::new(path.to_path_buf());
        if !path.exists() {
            return cache;
        }

        match Self::read_entries(path) {
            Ok(entries) => cache.entries = entries,
            Err(error) => {
                print_warning!("Ignoring unreadable cache file {}: {error:#}", path.display());
            }
        }
        cache
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, MovieRecord>> {
        let content = fs::read_to_string(path).context("Failed to read cache file")?;
        serde_json::from_str(&content).context("Failed to parse cache file")
    }

    /// Write all entries to disk.
    ///
    /// The JSON is written to a temporary file in the same directory
    /// which then replaces the previous cache file.
    ///
    /// # Errors
    /// Returns an error if the temporary file cannot be written or renamed.
    pub fn save(&mut self) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let temp_file = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temporary cache file in {}", parent.display()))?;

        {
            let mut writer = BufWriter::new(temp_file.as_file());
            serde_json::to_writer_pretty(&mut writer, &self.entries).context("Failed to serialize cache")?;
            writer.write_all(b"\n")?;
            writer.flush().context("Failed to write cache file")?;
        }
        temp_file.as_file().sync_all().context("Failed to sync cache file")?;

        temp_file
            .persist(&self.path)
            .with_context(|| format!("Failed to replace cache file {}", self.path.display()))?;

        self.modified = false;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, file_name: &str) -> Option<&MovieRecord> {
        self.entries.get(file_name)
    }

    #[must_use]
    pub fn contains(&self, file_name: &str) -> bool {
        self.entries.contains_key(file_name)
    }

    /// Add or replace the record for a file name.
    pub fn insert(&mut self, file_name: impl Into<String>, record: MovieRecord) {
        self.entries.insert(file_name.into(), record);
        self.modified = true;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if entries were added since loading or the last save.
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn entries(&self) -> &BTreeMap<String, MovieRecord> {
        &self.entries
    }
}

#[cfg(test)]
mod cache_store_tests {
    use super::*;

    use serde_json::Value;
    use tempfile::TempDir;

    use crate::movie::test_records::{movie, named};
    use crate::movie::{Poster, Rating};

    fn full_record() -> MovieRecord {
        let mut record = movie("Матрица", 1999);
        record.id = Some(301);
        record.alternative_name = Some("The Matrix".to_string());
        record.description = Some("Жизнь Томаса Андерсона".to_string());
        record.movie_length = Some(136);
        record.genres = named(&["фантастика", "боевик"]);
        record.countries = named(&["США"]);
        record.rating = Some(Rating {
            kp: Some(8.497),
            ..Default::default()
        });
        record.poster = Some(Poster {
            url: Some("https://example.com/301.jpg".to_string()),
            ..Default::default()
        });
        record.extra.insert("type".to_string(), Value::from("movie"));
        record
    }

    #[test]
    fn missing_file_gives_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::load(&dir.path().join(CACHE_FILENAME));
        assert!(cache.is_empty());
        assert!(!cache.is_modified());
    }

    #[test]
    fn corrupt_file_gives_empty_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CACHE_FILENAME);
        fs::write(&path, "{ not json").unwrap();

        let cache = CacheStore::load(&path);
        assert!(cache.is_empty());
        // The broken file is left alone until the next save replaces it.
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn round_trip_keeps_all_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CACHE_FILENAME);

        let mut cache = CacheStore::load(&path);
        cache.insert("The Matrix (1999).mkv", full_record());
        cache.insert("Heat (1995).avi", movie("Heat", 1995));
        cache.insert("Unknown.stub", MovieRecord::default());
        assert!(cache.is_modified());
        cache.save().unwrap();
        assert!(!cache.is_modified());

        let reloaded = CacheStore::load(&path);
        assert_eq!(reloaded.entries(), cache.entries());
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.get("The Matrix (1999).mkv"), Some(&full_record()));
    }

    #[test]
    fn save_writes_plain_json_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CACHE_FILENAME);

        let mut cache = CacheStore::new(path.clone());
        cache.insert("Heat (1995).avi", movie("Heat", 1995));
        cache.save().unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["Heat (1995).avi"]["name"], Value::from("Heat"));
        assert_eq!(value["Heat (1995).avi"]["year"], Value::from(1995));
    }

    #[test]
    fn save_replaces_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CACHE_FILENAME);
        fs::write(&path, "garbage").unwrap();

        let mut cache = CacheStore::load(&path);
        cache.insert("Heat (1995).avi", movie("Heat", 1995));
        cache.save().unwrap();

        let reloaded = CacheStore::load(&path);
        assert!(reloaded.contains("Heat (1995).avi"));
        // No temporary files are left behind.
        let files = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn reads_cache_written_by_hand() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CACHE_FILENAME);
        fs::write(
            &path,
            r#"{"Heat (1995).avi": {"id": 409, "name": "Схватка", "year": 1995, "votes": {"kp": 1}}}"#,
        )
        .unwrap();

        let cache = CacheStore::load(&path);
        let record = cache.get("Heat (1995).avi").unwrap();
        assert_eq!(record.id, Some(409));
        assert_eq!(record.extra.get("votes").unwrap()["kp"], Value::from(1));
        assert!(cache.get("Heat.1995.avi").is_none());
    }
}
