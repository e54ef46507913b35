//! Configuration module for mcat.
//!
//! Handles reading configuration from CLI arguments and the user config file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use movie_catalog::cache::CACHE_FILENAME;
use movie_catalog::inventory::{CANONICAL_PATTERN, DEFAULT_EXTENSIONS, FIXED_MARKER, NamingRules};
use movie_catalog::kinopoisk::{API_KEY_ENV, DEFAULT_API_URL, DEFAULT_LIMIT};
use movie_catalog::print_error;
use movie_catalog::report::REPORT_FILENAME;

use crate::CatalogArgs;

/// User configuration from the config file.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogConfig {
    /// Search endpoint URL.
    #[serde(default)]
    api_url: Option<String>,
    /// Kinopoisk API key.
    #[serde(default)]
    api_key: Option<String>,
    /// Number of search results to request.
    #[serde(default)]
    limit: Option<usize>,
    /// Video file extensions to include (without dot).
    #[serde(default)]
    extensions: Vec<String>,
    /// Cache file name or path. Relative paths are inside the movie directory.
    #[serde(default)]
    cache_file: Option<String>,
    /// Report file name or path. Relative paths are inside the movie directory.
    #[serde(default)]
    output_file: Option<String>,
    /// Regex for file names that are already in the final form.
    #[serde(default)]
    canonical_pattern: Option<String>,
    /// Stem suffix marking a file as manually fixed.
    #[serde(default)]
    fixed_marker: Option<String>,
    /// Maximum number of searches per file.
    #[serde(default)]
    max_queries: Option<usize>,
    /// Do not download posters.
    #[serde(default)]
    skip_posters: bool,
    /// Skip ambiguous files instead of asking.
    #[serde(default)]
    non_interactive: bool,
    /// Write a run log file.
    #[serde(default)]
    log: Option<bool>,
    /// Enable verbose output by default.
    #[serde(default)]
    verbose: bool,
}

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    /// Movie directory.
    pub root: PathBuf,
    pub api_url: String,
    pub api_key: String,
    pub limit: usize,
    /// Video file extensions (lowercase, without dot).
    pub extensions: Vec<String>,
    pub cache_path: PathBuf,
    pub output_path: PathBuf,
    pub rules: NamingRules,
    pub max_queries: Option<usize>,
    pub skip_posters: bool,
    pub non_interactive: bool,
    pub log: bool,
    pub verbose: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    catalog: CatalogConfig,
}

impl CatalogConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    pub fn get_user_config() -> Self {
        movie_catalog::config::CONFIG_PATH
            .as_deref()
            .filter(|path| path.exists())
            .and_then(|path| {
                fs::read_to_string(path)
                    .map_err(|error| {
                        print_error!("Error reading config file {}: {error}", path.display());
                    })
                    .ok()
            })
            .and_then(|config_string| Self::from_toml_str(&config_string))
            .unwrap_or_default()
    }

    /// Parse the `[catalog]` section from config file content.
    fn from_toml_str(config_string: &str) -> Option<Self> {
        toml::from_str::<UserConfig>(config_string)
            .map_err(|error| {
                print_error!("Error parsing config file: {error}");
            })
            .ok()
            .map(|config| config.catalog)
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the directory does not exist, the API key is missing,
    /// or the filename pattern is invalid.
    pub fn try_from_args(args: CatalogArgs, user_config: CatalogConfig) -> Result<Self> {
        let path = match args.path {
            Some(path) => path,
            None => crate::prompt::ask_directory()?,
        };
        let root = movie_catalog::resolve_input_path_str(Some(&path))?;
        if !root.is_dir() {
            anyhow::bail!("Not a directory: {}", root.display());
        }

        let api_key = resolve_api_key(args.api_key, env::var(API_KEY_ENV).ok(), user_config.api_key)
            .with_context(|| {
                format!("Kinopoisk API key is missing. Use --api-key, set {API_KEY_ENV}, or add `api_key` to the config file")
            })?;

        let api_url = user_config.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let limit = user_config.limit.filter(|limit| *limit > 0).unwrap_or(DEFAULT_LIMIT);

        let extensions: Vec<String> = if user_config.extensions.is_empty() {
            DEFAULT_EXTENSIONS.iter().map(|extension| (*extension).to_string()).collect()
        } else {
            user_config
                .extensions
                .into_iter()
                .map(|extension| extension.to_lowercase().trim_start_matches('.').to_string())
                .collect()
        };

        let rules = NamingRules::new(
            user_config.canonical_pattern.as_deref().unwrap_or(CANONICAL_PATTERN),
            user_config.fixed_marker.as_deref().unwrap_or(FIXED_MARKER),
        )?;

        let cache_path = path_in_root(&root, user_config.cache_file.as_deref().unwrap_or(CACHE_FILENAME));
        let output_path = path_in_root(
            &root,
            args.output
                .as_deref()
                .or(user_config.output_file.as_deref())
                .unwrap_or(REPORT_FILENAME),
        );

        Ok(Self {
            root,
            api_url,
            api_key,
            limit,
            extensions,
            cache_path,
            output_path,
            rules,
            max_queries: user_config.max_queries.filter(|max| *max > 0),
            skip_posters: args.skip_posters || user_config.skip_posters,
            non_interactive: args.non_interactive || user_config.non_interactive,
            log: user_config.log.unwrap_or(true),
            verbose: args.verbose || user_config.verbose,
        })
    }
}

/// Pick the API key with priority: CLI argument, environment variable, config file.
/// Blank values are ignored.
fn resolve_api_key(cli: Option<String>, env: Option<String>, config: Option<String>) -> Option<String> {
    [cli, env, config]
        .into_iter()
        .flatten()
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

/// Relative paths are placed inside the movie directory.
fn path_in_root(root: &Path, name: &str) -> PathBuf {
    let path = Path::new(name.trim());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
