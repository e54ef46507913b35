//! Local poster image cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use crate::print_warning;

/// Poster directory inside the catalog directory.
pub const POSTER_DIR: &str = ".posters";

const DEFAULT_EXTENSION: &str = "jpg";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads poster images once and reuses them on later runs.
#[derive(Debug)]
pub struct PosterCache {
    dir: PathBuf,
    client: Client,
}

impl PosterCache {
    /// Create a poster cache for the given catalog directory.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(root: &Path) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            dir: root.join(POSTER_DIR),
            client,
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the local poster for a movie, downloading it if needed.
    ///
    /// `name` is the canonical movie name used as the file stem.
    /// Returns the poster path relative to the catalog directory,
    /// or `None` if there is no poster or the download failed.
    pub async fn fetch(&self, url: &str, name: &str) -> Option<String> {
        let stem = crate::sanitize_file_name(name);
        if stem.is_empty() {
            return None;
        }
        if let Some(existing) = self.find_existing(&stem) {
            return Some(relative_poster_path(&existing));
        }

        match self.download(url, &stem).await {
            Ok(path) => path.map(|path| relative_poster_path(&path)),
            Err(error) => {
                print_warning!("Failed to download poster for {name}: {error:#}");
                None
            }
        }
    }

    /// Find a previously downloaded poster with the given stem and any extension.
    #[must_use]
    pub fn find_existing(&self, stem: &str) -> Option<PathBuf> {
        fs::read_dir(&self.dir)
            .ok()?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .find(|path| {
                crate::get_normalized_file_name_and_extension(path).is_ok_and(|(file_stem, _)| file_stem == stem)
            })
    }

    async fn download(&self, url: &str, stem: &str) -> Result<Option<PathBuf>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send poster request")?;

        if !response.status().is_success() {
            print_warning!("Poster request failed with HTTP {}: {url}", response.status());
            return Ok(None);
        }

        let extension = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(extension_from_content_type)
            .or_else(|| extension_from_url(url))
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        let bytes = response.bytes().await.context("Failed to read poster data")?;

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create poster directory: {}", self.dir.display()))?;
        let path = self.dir.join(format!("{stem}.{extension}"));
        fs::write(&path, &bytes).with_context(|| format!("Failed to write poster: {}", path.display()))?;
        Ok(Some(path))
    }
}

/// Path like `.posters/Heat (1995).jpg` for use in the report.
fn relative_poster_path(path: &Path) -> String {
    format!("{POSTER_DIR}/{}", crate::path_to_filename_string(path))
}

/// Image file extension from a content type such as `image/jpeg; charset=binary`.
fn extension_from_content_type(content_type: &str) -> Option<String> {
    let mime = content_type.split(';').next()?.trim().to_lowercase();
    let subtype = mime.strip_prefix("image/")?;
    let subtype = subtype.split('+').next()?;
    is_valid_extension(subtype).then(|| subtype.to_string())
}

/// Image file extension from the URL path.
fn extension_from_url(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let extension = Path::new(url.path()).extension()?.to_string_lossy().to_lowercase();
    is_valid_extension(&extension).then_some(extension)
}

fn is_valid_extension(extension: &str) -> bool {
    (1..=5).contains(&extension.len()) && extension.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod poster_cache_tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn content_type_extension() {
        assert_eq!(extension_from_content_type("image/jpeg").as_deref(), Some("jpeg"));
        assert_eq!(extension_from_content_type("image/PNG; charset=binary").as_deref(), Some("png"));
        assert_eq!(extension_from_content_type("image/svg+xml").as_deref(), Some("svg"));
        assert_eq!(extension_from_content_type("text/html"), None);
        assert_eq!(extension_from_content_type("image/"), None);
    }

    #[test]
    fn url_extension() {
        assert_eq!(
            extension_from_url("https://image.openmoviedb.com/kinopoisk-images/301.webp").as_deref(),
            Some("webp")
        );
        assert_eq!(extension_from_url("https://example.com/poster.JPG?size=orig").as_deref(), Some("jpg"));
        assert_eq!(extension_from_url("https://avatars.example.com/get-kinopoisk-image/1/2/orig"), None);
        assert_eq!(extension_from_url("not a url"), None);
    }

    #[tokio::test]
    async fn existing_poster_is_reused() {
        let dir = TempDir::new().unwrap();
        let posters = dir.path().join(POSTER_DIR);
        fs::create_dir(&posters).unwrap();
        fs::write(posters.join("Heat (1995).webp"), b"image").unwrap();

        let cache = PosterCache::new(dir.path()).unwrap();
        // Unreachable URL: any request would fail and return None.
        let poster = cache.fetch("http://127.0.0.1:9/heat.jpg", "Heat (1995)").await;
        assert_eq!(poster.as_deref(), Some(".posters/Heat (1995).webp"));
    }

    #[tokio::test]
    async fn failed_download_gives_no_poster() {
        let dir = TempDir::new().unwrap();
        let cache = PosterCache::new(dir.path()).unwrap();
        let poster = cache.fetch("http://127.0.0.1:9/heat.jpg", "Heat (1995)").await;
        assert_eq!(poster, None);
        assert!(!cache.dir().exists());
    }

    #[test]
    fn find_existing_matches_stem_only() {
        let dir = TempDir::new().unwrap();
        let cache = PosterCache::new(dir.path()).unwrap();
        assert_eq!(cache.find_existing("Heat (1995)"), None);

        fs::create_dir(cache.dir()).unwrap();
        fs::write(cache.dir().join("Heat (1995) (2).jpg"), b"image").unwrap();
        assert_eq!(cache.find_existing("Heat (1995)"), None);

        fs::write(cache.dir().join("Heat (1995).jpeg"), b"image").unwrap();
        assert_eq!(cache.find_existing("Heat (1995)"), Some(cache.dir().join("Heat (1995).jpeg")));
    }
}
