//! Kinopoisk API search client.
//!
//! Documentation:
//! <https://api.kinopoisk.dev/documentation>

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::movie::MovieRecord;
use crate::print_warning;

/// Default movie search endpoint.
pub const DEFAULT_API_URL: &str = "https://api.kinopoisk.dev/v1.4/movie/search";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "KINOPOISK_API_KEY";

/// Default number of search results to request.
pub const DEFAULT_LIMIT: usize = 5;

const API_KEY_HEADER: &str = "X-API-KEY";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Search for movie records by title.
///
/// An empty result is a normal outcome meaning nothing matched.
#[allow(async_fn_in_trait)]
pub trait MovieSearch {
    /// Search for movies matching the query, best match first.
    ///
    /// # Errors
    /// Implementations should only return an error for unrecoverable problems.
    /// A failed request is reported as an empty result.
    async fn search(&self, query: &str) -> Result<Vec<MovieRecord>>;
}

impl<T: MovieSearch + ?Sized> MovieSearch for &T {
    async fn search(&self, query: &str) -> Result<Vec<MovieRecord>> {
        (**self).search(query).await
    }
}

/// Kinopoisk search API client.
#[derive(Debug)]
pub struct KinopoiskClient {
    client: Client,
    url: Url,
    api_key: String,
    limit: usize,
}

/// Response body from the search endpoint.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, deserialize_with = "crate::movie::null_as_default")]
    docs: Vec<MovieRecord>,
}

impl KinopoiskClient {
    /// Create a new search client.
    ///
    /// # Errors
    /// Returns an error if the API key is missing, the URL is invalid,
    /// or the HTTP client cannot be created.
    pub fn new(api_url: &str, api_key: &str, limit: usize) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            anyhow::bail!("Kinopoisk API key is missing. Set {API_KEY_ENV} or `api_key` in the config file");
        }
        let url = Url::parse(api_url).with_context(|| format!("Invalid API URL: {api_url}"))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url,
            api_key: api_key.to_string(),
            limit: limit.max(1),
        })
    }

    /// Build the request URL with query parameters.
    fn search_url(&self, query: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("limit", &self.limit.to_string());
        url
    }

    /// Send the search request and decode the response body.
    async fn request(&self, query: &str) -> Result<Vec<MovieRecord>> {
        let response = self
            .client
            .get(self.search_url(query))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .context("Failed to send search request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read search response")?;

        match status {
            StatusCode::OK => parse_search_response(&body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                anyhow::bail!("API key was rejected: HTTP {status}")
            }
            _ => anyhow::bail!("HTTP {status} - {}", body.trim()),
        }
    }
}

impl MovieSearch for KinopoiskClient {
    async fn search(&self, query: &str) -> Result<Vec<MovieRecord>> {
        match self.request(query).await {
            Ok(records) => Ok(records),
            Err(error) => {
                print_warning!("Search for \"{query}\" failed: {error:#}");
                Ok(Vec::new())
            }
        }
    }
}

/// Decode the movie list from a search response body.
fn parse_search_response(body: &str) -> Result<Vec<MovieRecord>> {
    let response: SearchResponse = serde_json::from_str(body).context("Failed to parse search response JSON")?;
    Ok(response.docs)
}
