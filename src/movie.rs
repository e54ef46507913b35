//! Movie records returned by the Kinopoisk search API.
//!
//! Only the fields the catalog needs are typed.
//! Everything else is kept in `extra` so the cache file round-trips without losing data.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Base URL for movie pages on Kinopoisk.
const MOVIE_PAGE_URL: &str = "https://www.kinopoisk.ru/film";

/// One search result from the metadata service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<NamedValue>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<NamedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Runtime in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<Poster>,
    /// Fields not used by the catalog, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ratings from different sources. Only the Kinopoisk rating is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kp: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Genre or country entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedValue {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poster {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MovieRecord {
    /// Primary title, falling back to the alternative (original language) title.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        non_empty(self.name.as_deref()).or_else(|| non_empty(self.alternative_name.as_deref()))
    }

    /// Name used for renamed files and poster files: `Title (Year)`, or just `Title` without a year.
    ///
    /// Returns `None` if the record has no usable title.
    #[must_use]
    pub fn canonical_name(&self) -> Option<String> {
        let title = self.title()?;
        Some(self.year.map_or_else(|| title.to_string(), |year| format!("{title} ({year})")))
    }

    /// Kinopoisk rating if the movie has been rated.
    /// The API reports unrated movies as zero.
    #[must_use]
    pub fn kp_rating(&self) -> Option<f64> {
        self.rating
            .as_ref()
            .and_then(|rating| rating.kp)
            .filter(|value| *value > 0.0)
    }

    /// Runtime in minutes if known.
    /// The API reports unknown runtime as zero or null.
    #[must_use]
    pub fn length_minutes(&self) -> Option<u32> {
        self.movie_length.filter(|minutes| *minutes > 0)
    }

    #[must_use]
    pub fn poster_url(&self) -> Option<&str> {
        self.poster.as_ref().and_then(|poster| non_empty(poster.url.as_deref()))
    }

    #[must_use]
    pub fn genre_names(&self) -> Vec<String> {
        names(&self.genres)
    }

    #[must_use]
    pub fn country_names(&self) -> Vec<String> {
        names(&self.countries)
    }

    /// Link to the movie page on Kinopoisk.
    #[must_use]
    pub fn page_url(&self) -> Option<String> {
        self.id.map(|id| format!("{MOVIE_PAGE_URL}/{id}/"))
    }
}

/// One-line summary used when listing candidates: `name (year) / alternativeName`.
impl fmt::Display for MovieRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("?");
        let year = self.year.map_or_else(|| "?".to_string(), |year| year.to_string());
        write!(f, "{name} ({year})")?;
        if let Some(alternative) = non_empty(self.alternative_name.as_deref()) {
            write!(f, " / {alternative}")?;
        }
        Ok(())
    }
}

/// Treat an explicit JSON `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn names(values: &[NamedValue]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}


#[cfg(test)]
mod movie_record_tests {
    use super::test_records::movie;
    use super::*;

    const SAMPLE: &str = r#"{
        "id": 301,
        "name": "Матрица",
        "alternativeName": "The Matrix",
        "type": "movie",
        "year": 1999,
        "description": "Жизнь Томаса Андерсона разделена на две части",
        "rating": {"kp": 8.497, "imdb": 8.7, "filmCritics": 7.7},
        "votes": {"kp": 1007185, "imdb": 2162364},
        "movieLength": 136,
        "genres": [{"name": "фантастика"}, {"name": "боевик"}],
        "countries": [{"name": "США"}],
        "poster": {"url": "https://image.openmoviedb.com/kinopoisk-images/301.jpg", "previewUrl": "https://image.openmoviedb.com/preview/301.jpg"}
    }"#;

    #[test]
    fn parses_search_result() {
        let record: MovieRecord = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(record.id, Some(301));
        assert_eq!(record.name.as_deref(), Some("Матрица"));
        assert_eq!(record.alternative_name.as_deref(), Some("The Matrix"));
        assert_eq!(record.year, Some(1999));
        assert_eq!(record.length_minutes(), Some(136));
        assert_eq!(record.genre_names(), vec!["фантастика", "боевик"]);
        assert_eq!(record.country_names(), vec!["США"]);
        assert_eq!(
            record.poster_url(),
            Some("https://image.openmoviedb.com/kinopoisk-images/301.jpg")
        );
        assert_eq!(record.page_url().as_deref(), Some("https://www.kinopoisk.ru/film/301/"));
    }

    #[test]
    fn keeps_unknown_fields() {
        let record: MovieRecord = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(record.extra.get("type"), Some(&Value::from("movie")));
        assert!(record.extra.contains_key("votes"));

        let rating = record.rating.as_ref().unwrap();
        assert_eq!(rating.extra.get("imdb"), Some(&Value::from(8.7)));

        let serialized = serde_json::to_value(&record).unwrap();
        assert_eq!(serialized["votes"]["kp"], Value::from(1_007_185));
        assert_eq!(serialized["rating"]["filmCritics"], Value::from(7.7));
    }

    #[test]
    fn null_fields_are_absent() {
        let record: MovieRecord =
            serde_json::from_str(r#"{"id": 1, "name": "X", "alternativeName": null, "movieLength": null}"#).unwrap();
        assert_eq!(record.alternative_name, None);
        assert_eq!(record.length_minutes(), None);
        assert!(record.extra.is_empty());
    }

    #[test]
    fn null_lists_and_names_are_empty() {
        let records: Vec<MovieRecord> = serde_json::from_str(
            r#"[
                {"id": 1, "name": "A", "genres": null, "countries": null},
                {"id": 2, "name": "B", "genres": [{"name": null}, {"name": "драма"}], "countries": [{"name": "США"}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].genres.is_empty());
        assert!(records[0].countries.is_empty());
        assert_eq!(records[1].genre_names(), vec!["драма"]);
        assert_eq!(records[1].country_names(), vec!["США"]);

        let serialized = serde_json::to_value(&records[0]).unwrap();
        assert!(serialized.get("genres").is_none());
    }

    #[test]
    fn zero_rating_and_length_are_unknown() {
        let record: MovieRecord =
            serde_json::from_str(r#"{"name": "X", "rating": {"kp": 0}, "movieLength": 0}"#).unwrap();
        assert_eq!(record.kp_rating(), None);
        assert_eq!(record.length_minutes(), None);
    }

    #[test]
    fn canonical_name_with_and_without_year() {
        assert_eq!(movie("The Matrix", 1999).canonical_name().as_deref(), Some("The Matrix (1999)"));

        let no_year = MovieRecord {
            name: Some("Untitled".to_string()),
            ..Default::default()
        };
        assert_eq!(no_year.canonical_name().as_deref(), Some("Untitled"));
    }

    #[test]
    fn title_falls_back_to_alternative_name() {
        let record = MovieRecord {
            name: Some("  ".to_string()),
            alternative_name: Some("Original Title".to_string()),
            year: Some(2010),
            ..Default::default()
        };
        assert_eq!(record.title(), Some("Original Title"));
        assert_eq!(record.canonical_name().as_deref(), Some("Original Title (2010)"));

        assert_eq!(MovieRecord::default().canonical_name(), None);
    }

    #[test]
    fn display_summary_line() {
        let mut record = movie("Матрица", 1999);
        assert_eq!(record.to_string(), "Матрица (1999)");

        record.alternative_name = Some("The Matrix".to_string());
        assert_eq!(record.to_string(), "Матрица (1999) / The Matrix");
    }
}
