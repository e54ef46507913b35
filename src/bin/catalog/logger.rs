use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use chrono::Local;

use movie_catalog::resolver::{Resolution, SkipReason};

use crate::config::Config;
use crate::stats::RunStats;

/// Run log with buffered writes
pub struct FileLogger {
    writer: BufWriter<File>,
}

impl FileLogger {
    /// Create a new file logger, writing to ~/logs/movie-catalog/catalog_<timestamp>.log
    pub(crate) fn new() -> Result<Self> {
        let log_dir = movie_catalog::config::LOG_DIR
            .as_deref()
            .context("Failed to get home directory")?;

        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let log_path = log_dir.join(format!("catalog_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log when starting the program
    pub(crate) fn log_init(&mut self, config: &Config, file_count: usize) {
        let _ = writeln!(self.writer, "[{}] INIT \"{}\"", Self::timestamp(), config.root.display());
        let _ = writeln!(self.writer, "  files: {file_count}");
        let _ = writeln!(self.writer, "  api_url: {}", config.api_url);
        let _ = writeln!(self.writer, "  limit: {}", config.limit);
        let _ = writeln!(self.writer, "  extensions: {:?}", config.extensions);
        let _ = writeln!(self.writer, "  cache: \"{}\"", config.cache_path.display());
        let _ = writeln!(self.writer, "  output: \"{}\"", config.output_path.display());
        if let Some(max_queries) = config.max_queries {
            let _ = writeln!(self.writer, "  max_queries: {max_queries}");
        }
        let _ = writeln!(self.writer, "  skip_posters: {}", config.skip_posters);
        let _ = writeln!(self.writer, "  non_interactive: {}", config.non_interactive);
        let _ = self.writer.flush();
    }

    /// Log the outcome for one file
    pub(crate) fn log_resolution(&mut self, resolution: &Resolution) {
        let timestamp = Self::timestamp();
        match resolution {
            Resolution::Cached { file_name, record } => {
                let _ = writeln!(self.writer, "[{timestamp}] CACHED   \"{file_name}\" | {record}");
            }
            Resolution::Matched {
                file_name,
                record,
                renamed_from,
                ..
            } => {
                let _ = writeln!(self.writer, "[{timestamp}] RESOLVED \"{file_name}\" | {record}");
                if let Some(old_name) = renamed_from {
                    let _ = writeln!(self.writer, "[{timestamp}] RENAMED  \"{old_name}\" -> \"{file_name}\"");
                }
            }
            Resolution::Skipped { file_name, reason } => {
                let reason = match reason {
                    SkipReason::Operator => "skipped by user",
                    SkipReason::QueryLimit => "query limit reached",
                };
                let _ = writeln!(self.writer, "[{timestamp}] SKIPPED  \"{file_name}\" | {reason}");
            }
        }
        let _ = self.writer.flush();
    }

    /// Log when a file fails
    pub(crate) fn log_failure(&mut self, file_name: &str, error: &str) {
        let _ = writeln!(self.writer, "[{}] ERROR    \"{file_name}\" | {error}", Self::timestamp());
        let _ = self.writer.flush();
    }

    /// Log final statistics
    pub(crate) fn log_stats(&mut self, stats: &RunStats, catalog_size: usize, total_duration: &str) {
        let _ = writeln!(self.writer, "[{}] STATISTICS", Self::timestamp());
        let _ = writeln!(self.writer, "  Files from cache: {}", stats.files_cached);
        let _ = writeln!(self.writer, "  Files matched:    {}", stats.files_matched);
        let _ = writeln!(self.writer, "  Files renamed:    {}", stats.files_renamed);
        let _ = writeln!(self.writer, "  Files failed:     {}", stats.files_failed);
        let _ = writeln!(self.writer, "  Files skipped:    {}", stats.total_skipped());
        if stats.total_skipped() > 0 {
            let _ = writeln!(self.writer, "    - By user:     {}", stats.files_skipped_operator);
            let _ = writeln!(self.writer, "    - Query limit: {}", stats.files_skipped_query_limit);
        }
        let _ = writeln!(self.writer, "  Catalog movies:   {catalog_size}");
        let _ = writeln!(self.writer, "  Total duration:   {total_duration}");
        let _ = writeln!(self.writer, "  Total time: {:.1}s", stats.total_duration.as_secs_f64());
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}
