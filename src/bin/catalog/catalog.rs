use std::time::Instant;

use anyhow::Result;
use colored::Colorize;

use movie_catalog::cache::CacheStore;
use movie_catalog::catalog::{Catalog, CatalogEntry};
use movie_catalog::inventory::{VideoFile, gather_video_files};
use movie_catalog::kinopoisk::KinopoiskClient;
use movie_catalog::movie::MovieRecord;
use movie_catalog::poster::PosterCache;
use movie_catalog::report::write_report;
use movie_catalog::resolver::{DecisionProvider, Resolution, Resolver, ResolverOptions, SkipAmbiguous};
use movie_catalog::{print_error, print_warning};

use crate::CatalogArgs;
use crate::config::{CatalogConfig, Config};
use crate::logger::FileLogger;
use crate::prompt::ConsolePrompt;
use crate::stats::RunStats;

/// Builds the movie catalog for one directory.
pub struct MovieCatalog {
    config: Config,
    logger: Option<FileLogger>,
}

impl MovieCatalog {
    /// Create from command line args and the user config file.
    ///
    /// # Errors
    /// Returns an error if the config is invalid.
    pub fn new(args: CatalogArgs) -> Result<Self> {
        let user_config = CatalogConfig::get_user_config();
        let config = Config::try_from_args(args, user_config)?;
        Ok(Self { config, logger: None })
    }

    /// Resolve all video files, write the report, and save the cache.
    pub async fn run(mut self) -> Result<()> {
        let start = Instant::now();
        let files = gather_video_files(&self.config.root, &self.config.extensions, &self.config.rules)?;
        if files.is_empty() {
            print_warning!("No video files found in {}", self.config.root.display());
            return Ok(());
        }
        println!(
            "{}",
            format!("Found {} video files in {}", files.len(), self.config.root.display()).bold()
        );

        if self.config.log {
            match FileLogger::new() {
                Ok(mut logger) => {
                    logger.log_init(&self.config, files.len());
                    self.logger = Some(logger);
                }
                Err(error) => print_warning!("Failed to create log file: {error:#}"),
            }
        }

        let search = KinopoiskClient::new(&self.config.api_url, &self.config.api_key, self.config.limit)?;
        let posters = if self.config.skip_posters {
            None
        } else {
            Some(PosterCache::new(&self.config.root)?)
        };
        let cache = CacheStore::load(&self.config.cache_path);
        if self.config.verbose {
            println!("Cache: {} entries from {}", cache.len(), cache.path().display());
        }

        let options = ResolverOptions {
            rules: self.config.rules.clone(),
            max_queries: self.config.max_queries,
            verbose: self.config.verbose,
        };
        let root = self.config.root.clone();

        let mut stats = RunStats::default();
        let mut catalog = Catalog::new();
        let mut cache = if self.config.non_interactive {
            let resolver = Resolver::new(root, cache, &search, SkipAmbiguous, options);
            self.resolve_files(&files, resolver, posters.as_ref(), &mut catalog, &mut stats)
                .await
        } else {
            let resolver = Resolver::new(root, cache, &search, ConsolePrompt, options);
            self.resolve_files(&files, resolver, posters.as_ref(), &mut catalog, &mut stats)
                .await
        };

        let report_result = write_report(&self.config.output_path, &catalog);
        if cache.is_modified() {
            cache.save()?;
        }
        report_result?;

        stats.total_duration = start.elapsed();
        stats.print_summary();
        println!(
            "\n{} {} movies, {}",
            "Catalog:".bold(),
            catalog.len(),
            catalog.total_duration_display()
        );
        println!("{}", self.config.output_path.display());

        if let Some(logger) = self.logger.as_mut() {
            logger.log_stats(&stats, catalog.len(), &catalog.total_duration_display());
        }
        Ok(())
    }

    /// Resolve files one at a time and give back the updated cache.
    async fn resolve_files<D: DecisionProvider>(
        &mut self,
        files: &[VideoFile],
        mut resolver: Resolver<&KinopoiskClient, D>,
        posters: Option<&PosterCache>,
        catalog: &mut Catalog,
        stats: &mut RunStats,
    ) -> CacheStore {
        let total = files.len();
        for (index, file) in files.iter().enumerate() {
            let cached = resolver.cache().contains(&file.file_name);
            if !cached || self.config.verbose {
                println!("{}", format!("[{}/{total}] {}", index + 1, file.file_name).bold());
            }

            let resolution = match resolver.resolve(file).await {
                Ok(resolution) => resolution,
                Err(error) => {
                    print_error!("{}: {error:#}", file.file_name);
                    stats.add_failure();
                    if let Some(logger) = self.logger.as_mut() {
                        logger.log_failure(&file.file_name, &format!("{error:#}"));
                    }
                    continue;
                }
            };

            stats.add_resolution(&resolution);
            if let Some(logger) = self.logger.as_mut() {
                logger.log_resolution(&resolution);
            }
            self.print_resolution(&resolution);

            if let Some(record) = resolution.record() {
                let poster = match posters {
                    Some(posters) => fetch_poster(posters, record).await,
                    None => None,
                };
                catalog.add(CatalogEntry::new(resolution.file_name(), record, poster));
            }
        }
        resolver.into_cache()
    }

    fn print_resolution(&self, resolution: &Resolution) {
        match resolution {
            Resolution::Cached { record, .. } => {
                if self.config.verbose {
                    println!("  {} {record}", "Cached:".dimmed());
                }
            }
            Resolution::Matched { record, .. } => {
                println!("  {} {record}", "Match:".green());
            }
            Resolution::Skipped { .. } => {
                println!("  {}", "Skipped".yellow());
            }
        }
    }
}

async fn fetch_poster(posters: &PosterCache, record: &MovieRecord) -> Option<String> {
    let url = record.poster_url()?;
    let name = record.canonical_name()?;
    posters.fetch(url, &name).await
}
