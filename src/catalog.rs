//! Catalog entries built from resolved movie records.

use itertools::Itertools;

use crate::movie::MovieRecord;

/// Displayed in place of missing values.
pub const UNKNOWN: &str = "unknown";

/// One row of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Current file name of the video file.
    pub file_name: String,
    pub title: String,
    pub year: Option<i32>,
    pub description: String,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
    /// Kinopoisk rating rounded to two decimals.
    pub rating: Option<f64>,
    /// Runtime in minutes.
    pub duration: Option<u32>,
    /// Poster image path relative to the catalog directory.
    pub poster: Option<String>,
    /// Movie page URL.
    pub link: Option<String>,
}

/// All catalog entries and the running total duration.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    total_minutes: u64,
}

impl CatalogEntry {
    /// Project a movie record into a catalog row.
    #[must_use]
    pub fn new(file_name: &str, record: &MovieRecord, poster: Option<String>) -> Self {
        Self {
            file_name: file_name.to_string(),
            title: record
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(UNKNOWN)
                .to_string(),
            year: record.year,
            description: record
                .description
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .unwrap_or(UNKNOWN)
                .to_string(),
            genres: record.genre_names(),
            countries: record.country_names(),
            rating: record.kp_rating().map(round_to_two_decimals),
            duration: record.length_minutes(),
            poster,
            link: record.page_url(),
        }
    }

    #[must_use]
    pub fn year_display(&self) -> String {
        self.year.map_or_else(|| UNKNOWN.to_string(), |year| year.to_string())
    }

    #[must_use]
    pub fn genres_display(&self) -> String {
        join_or_unknown(&self.genres)
    }

    #[must_use]
    pub fn countries_display(&self) -> String {
        join_or_unknown(&self.countries)
    }

    #[must_use]
    pub fn rating_display(&self) -> String {
        self.rating
            .map_or_else(|| UNKNOWN.to_string(), |rating| format!("{rating:.2}"))
    }

    #[must_use]
    pub fn duration_display(&self) -> String {
        self.duration
            .map_or_else(|| UNKNOWN.to_string(), |minutes| minutes.to_string())
    }
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Only known durations count towards the total.
    pub fn add(&mut self, entry: CatalogEntry) {
        if let Some(minutes) = entry.duration {
            self.total_minutes += u64::from(minutes);
        }
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn total_minutes(&self) -> u64 {
        self.total_minutes
    }

    /// Total duration formatted as `{h}h {m}m`.
    #[must_use]
    pub fn total_duration_display(&self) -> String {
        crate::format_minutes(self.total_minutes)
    }

    /// Sorted unique genre names across all entries.
    #[must_use]
    pub fn genres(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|entry| entry.genres.iter().cloned())
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// Sorted unique country names across all entries.
    #[must_use]
    pub fn countries(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|entry| entry.countries.iter().cloned())
            .sorted_unstable()
            .dedup()
            .collect()
    }
}

fn join_or_unknown(values: &[String]) -> String {
    if values.is_empty() {
        UNKNOWN.to_string()
    } else {
        values.iter().join(", ")
    }
}

fn round_to_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
