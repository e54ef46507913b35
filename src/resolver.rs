//! Resolve video files to a single movie record.
//!
//! The resolver checks the cache, searches the metadata service, asks a
//! [`DecisionProvider`] when the result is ambiguous, renames the file to
//! `Title (Year).ext` and records the choice in the cache.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use unicode_normalization::UnicodeNormalization;

use crate::cache::CacheStore;
use crate::inventory::{NamingRules, VideoFile, normalize_query};
use crate::kinopoisk::MovieSearch;
use crate::movie::MovieRecord;

/// Maximum number of candidates shown for selection.
pub const MAX_CANDIDATES: usize = 5;

/// Operator answer when the search result is empty or ambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Pick a candidate by its 1-based position in the list.
    Select(usize),
    /// Search again with a different title.
    Requery(String),
    /// Give up on this file.
    Skip,
}

/// Chooses between candidates when the resolver cannot decide on its own.
pub trait DecisionProvider {
    /// Decide what to do with the search result for `query`.
    ///
    /// `candidates` is empty when nothing was found,
    /// in which case only [`Decision::Requery`] and [`Decision::Skip`] are meaningful.
    ///
    /// # Errors
    /// Returns an error if the decision cannot be obtained, for example when stdin is closed.
    fn decide(&mut self, file_name: &str, query: &str, candidates: &[MovieRecord]) -> Result<Decision>;
}

impl<T: DecisionProvider + ?Sized> DecisionProvider for &mut T {
    fn decide(&mut self, file_name: &str, query: &str, candidates: &[MovieRecord]) -> Result<Decision> {
        (**self).decide(file_name, query, candidates)
    }
}

/// Decision provider for unattended runs: every empty or ambiguous result is skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipAmbiguous;

impl DecisionProvider for SkipAmbiguous {
    fn decide(&mut self, _file_name: &str, _query: &str, _candidates: &[MovieRecord]) -> Result<Decision> {
        Ok(Decision::Skip)
    }
}

/// Why a file was left without a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Operator chose to skip.
    Operator,
    /// The configured number of searches ran out.
    QueryLimit,
}

/// Result of resolving one file.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Record was found in the cache. No search and no rename.
    Cached { file_name: String, record: MovieRecord },
    /// Record was selected from search results.
    Matched {
        /// File name after resolving. Differs from the original if the file was renamed.
        file_name: String,
        record: MovieRecord,
        /// Original file name if the file was renamed.
        renamed_from: Option<String>,
        /// The decision provider was asked.
        prompted: bool,
    },
    /// No record for this file.
    Skipped { file_name: String, reason: SkipReason },
}

impl Resolution {
    /// Current file name of the resolved file.
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Cached { file_name, .. } | Self::Matched { file_name, .. } | Self::Skipped { file_name, .. } => {
                file_name
            }
        }
    }

    /// Selected record, or `None` if the file was skipped.
    #[must_use]
    pub const fn record(&self) -> Option<&MovieRecord> {
        match self {
            Self::Cached { record, .. } | Self::Matched { record, .. } => Some(record),
            Self::Skipped { .. } => None,
        }
    }
}

/// Resolver settings.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    pub rules: NamingRules,
    /// Maximum number of searches per file. `None` means no limit.
    pub max_queries: Option<usize>,
    pub verbose: bool,
}

/// Resolves video files against the cache and the search service.
pub struct Resolver<S: MovieSearch, D: DecisionProvider> {
    root: PathBuf,
    cache: CacheStore,
    search: S,
    decisions: D,
    options: ResolverOptions,
}

impl<S: MovieSearch, D: DecisionProvider> Resolver<S, D> {
    /// Create a resolver for files in the `root` directory.
    pub fn new(root: PathBuf, cache: CacheStore, search: S, decisions: D, options: ResolverOptions) -> Self {
        Self {
            root,
            cache,
            search,
            decisions,
            options,
        }
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Give back the cache so it can be saved.
    #[must_use]
    pub fn into_cache(self) -> CacheStore {
        self.cache
    }

    /// Resolve a single file.
    ///
    /// Cached file names return immediately without a search.
    /// Otherwise the search is repeated until a record is selected or the file is skipped.
    ///
    /// # Errors
    /// Returns an error if the search fails unrecoverably or the decision provider fails.
    pub async fn resolve(&mut self, file: &VideoFile) -> Result<Resolution> {
        if let Some(record) = self.cache.get(&file.file_name) {
            return Ok(Resolution::Cached {
                file_name: file.file_name.clone(),
                record: record.clone(),
            });
        }

        let mut query = self.options.rules.search_query(&file.stem);
        let mut queries: usize = 0;
        let mut prompted = false;

        loop {
            if self.options.max_queries.is_some_and(|max| queries >= max) {
                crate::print_warning!("Giving up on {} after {queries} searches", file.file_name);
                return Ok(Resolution::Skipped {
                    file_name: file.file_name.clone(),
                    reason: SkipReason::QueryLimit,
                });
            }
            queries += 1;

            if self.options.verbose {
                println!("  {} {query}", "Search:".dimmed());
            }
            let mut candidates = self.search.search(&query).await?;
            candidates.truncate(MAX_CANDIDATES);

            let decision = if candidates.len() == 1 || (file.already_canonical && !candidates.is_empty()) {
                Decision::Select(1)
            } else {
                prompted = true;
                self.ask(file, &query, &candidates)?
            };

            match decision {
                Decision::Select(number) => {
                    let record = candidates.swap_remove(number - 1);
                    return Ok(self.accept(file, record, prompted));
                }
                Decision::Requery(text) => {
                    query = normalize_query(&text);
                }
                Decision::Skip => {
                    return Ok(Resolution::Skipped {
                        file_name: file.file_name.clone(),
                        reason: SkipReason::Operator,
                    });
                }
            }
        }
    }

    /// Ask the decision provider until it gives a usable answer.
    fn ask(&mut self, file: &VideoFile, query: &str, candidates: &[MovieRecord]) -> Result<Decision> {
        loop {
            match self.decisions.decide(&file.file_name, query, candidates)? {
                Decision::Select(0) => return Ok(Decision::Skip),
                Decision::Select(number) if number > candidates.len() => {
                    crate::print_warning!("Invalid selection {number}, choose 1-{}", candidates.len());
                }
                Decision::Requery(text) if normalize_query(&text).is_empty() => {
                    crate::print_warning!("Empty title, enter a title or 0 to skip");
                }
                decision => return Ok(decision),
            }
        }
    }

    /// Rename the file if needed and record the selection in the cache.
    fn accept(&mut self, file: &VideoFile, record: MovieRecord, prompted: bool) -> Resolution {
        let file_name = if file.already_canonical {
            file.file_name.clone()
        } else {
            match self.rename(file, &record) {
                Ok(name) => name,
                Err(error) => {
                    crate::print_error!("Failed to rename {}: {error:#}", file.file_name);
                    file.file_name.clone()
                }
            }
        };

        self.cache.insert(file_name.clone(), record.clone());

        let renamed_from = (file_name != file.file_name).then(|| file.file_name.clone());
        Resolution::Matched {
            file_name,
            record,
            renamed_from,
            prompted,
        }
    }

    /// Rename the file to `Title (Year).ext` and return the new file name.
    ///
    /// An existing file with the target name is never overwritten:
    /// a running index is appended instead.
    fn rename(&self, file: &VideoFile, record: &MovieRecord) -> Result<String> {
        let Some(target_name) = target_file_name(record, &file.dotted_extension()) else {
            crate::print_warning!("Movie has no title, keeping name: {}", file.file_name);
            return Ok(file.file_name.clone());
        };
        if target_name == file.file_name {
            return Ok(target_name);
        }

        let source = &file.path;
        let mut target = self.root.join(&target_name);

        // Case-insensitive file systems report the target as existing,
        // so only an entry with exactly the target name is a different file.
        let same_file_name = fold_file_name(&target_name) == fold_file_name(&file.file_name);
        if same_file_name && !has_exact_entry(&self.root, &target_name) {
            rename_with_temp_file(source, &target)?;
        } else {
            if target.exists() {
                target = crate::get_incremented_path(&target)?;
            }
            fs::rename(source, &target).with_context(|| format!("Failed to rename to {}", target.display()))?;
        }

        let new_name = crate::path_to_filename_string(&target);
        println!("{}", "Rename:".bold().magenta());
        crate::show_diff(&file.file_name, &new_name);
        Ok(new_name)
    }
}

/// Build the target file name for a record: `Title (Year).ext` without illegal characters.
///
/// Returns `None` if the record has no title.
///
/// ```rust
/// use movie_catalog::movie::MovieRecord;
/// use movie_catalog::resolver::target_file_name;
///
/// let record = MovieRecord {
///     name: Some(r#"Film: The "Great" One?"#.to_string()),
///     year: Some(2001),
///     ..Default::default()
/// };
/// assert_eq!(target_file_name(&record, ".mkv").unwrap(), "Film The Great One (2001).mkv");
/// ```
#[must_use]
pub fn target_file_name(record: &MovieRecord, dotted_extension: &str) -> Option<String> {
    let name = crate::sanitize_file_name(&record.canonical_name()?);
    if name.is_empty() {
        return None;
    }
    Some(format!("{name}{dotted_extension}"))
}

/// File name compared without case or Unicode normalization differences.
fn fold_file_name(name: &str) -> String {
    name.nfc().collect::<String>().to_lowercase()
}

/// Check if the directory has an entry with exactly this name.
fn has_exact_entry(dir: &Path, name: &str) -> bool {
    fs::read_dir(dir).is_ok_and(|entries| entries.flatten().any(|entry| entry.file_name() == name))
}

/// Rename through a temporary file so capitalization-only changes work on case-insensitive file systems.
fn rename_with_temp_file(path: &Path, new_path: &Path) -> Result<()> {
    let temp_path = new_path.with_file_name(format!(".{}.tmp", crate::path_to_filename_string(new_path)));
    fs::rename(path, &temp_path).with_context(|| format!("Failed to rename to {}", temp_path.display()))?;
    fs::rename(&temp_path, new_path).with_context(|| format!("Failed to rename to {}", new_path.display()))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_helpers {
    //! Fake search service and scripted decision provider.

    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    use super::*;

    /// Search service with fixed results per query that records every call.
    #[derive(Default)]
    pub struct FakeSearch {
        results: HashMap<String, Vec<MovieRecord>>,
        pub calls: RefCell<Vec<String>>,
    }

    impl FakeSearch {
        pub fn with(mut self, query: &str, records: Vec<MovieRecord>) -> Self {
            self.results.insert(query.to_string(), records);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl MovieSearch for FakeSearch {
        async fn search(&self, query: &str) -> Result<Vec<MovieRecord>> {
            self.calls.borrow_mut().push(query.to_string());
            Ok(self.results.get(query).cloned().unwrap_or_default())
        }
    }

    /// Decision provider that replays prepared answers and records the candidate counts it saw.
    #[derive(Default)]
    pub struct Scripted {
        answers: VecDeque<Decision>,
        pub seen: Vec<(String, usize)>,
    }

    impl Scripted {
        pub fn new(answers: Vec<Decision>) -> Self {
            Self {
                answers: answers.into(),
                seen: Vec::new(),
            }
        }
    }

    impl DecisionProvider for Scripted {
        fn decide(&mut self, _file_name: &str, query: &str, candidates: &[MovieRecord]) -> Result<Decision> {
            self.seen.push((query.to_string(), candidates.len()));
            self.answers
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("Unexpected prompt for query: {query}"))
        }
    }
}
