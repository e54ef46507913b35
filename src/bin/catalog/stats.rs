use std::time::Duration;

use colored::Colorize;

use movie_catalog::resolver::{Resolution, SkipReason};

/// Statistics for the catalog run
#[derive(Debug, Default)]
pub struct RunStats {
    pub(crate) files_cached: usize,
    pub(crate) files_matched: usize,
    pub(crate) files_renamed: usize,
    pub(crate) files_prompted: usize,
    pub(crate) files_skipped_operator: usize,
    pub(crate) files_skipped_query_limit: usize,
    pub(crate) files_failed: usize,
    pub(crate) total_duration: Duration,
}

impl RunStats {
    pub(crate) fn add_resolution(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Cached { .. } => self.files_cached += 1,
            Resolution::Matched {
                renamed_from, prompted, ..
            } => {
                self.files_matched += 1;
                if renamed_from.is_some() {
                    self.files_renamed += 1;
                }
                if *prompted {
                    self.files_prompted += 1;
                }
            }
            Resolution::Skipped { reason, .. } => match reason {
                SkipReason::Operator => self.files_skipped_operator += 1,
                SkipReason::QueryLimit => self.files_skipped_query_limit += 1,
            },
        }
    }

    pub(crate) const fn add_failure(&mut self) {
        self.files_failed += 1;
    }

    pub(crate) const fn total_skipped(&self) -> usize {
        self.files_skipped_operator + self.files_skipped_query_limit
    }

    pub(crate) const fn total_resolved(&self) -> usize {
        self.files_cached + self.files_matched
    }

    pub(crate) fn print_summary(&self) {
        println!("{}", "\n--- Catalog Summary ---".bold().magenta());
        println!("Files resolved:     {}", self.total_resolved());
        println!("Files from cache:   {}", self.files_cached);
        println!("Files matched:      {}", self.files_matched);
        if self.files_matched > 0 {
            println!("  - Renamed:        {}", self.files_renamed);
            println!("  - Selected:       {}", self.files_prompted);
        }
        println!(
            "Files failed:       {}",
            if self.files_failed > 0 {
                self.files_failed.to_string().red()
            } else {
                "0".normal()
            }
        );
        println!(
            "Files skipped:      {}",
            if self.total_skipped() > 0 {
                self.total_skipped().to_string().yellow()
            } else {
                "0".normal()
            }
        );
        if self.files_skipped_query_limit > 0 {
            println!("  - By user:        {}", self.files_skipped_operator);
            println!("  - Query limit:    {}", self.files_skipped_query_limit);
        }
        println!("Total time:         {:.1}s", self.total_duration.as_secs_f64());
    }
}

#[cfg(test)]
mod run_stats_tests {
    use super::*;

    use movie_catalog::movie::MovieRecord;

    fn matched(renamed: bool, prompted: bool) -> Resolution {
        Resolution::Matched {
            file_name: "Heat (1995).mkv".to_string(),
            record: MovieRecord::default(),
            renamed_from: renamed.then(|| "heat.mkv".to_string()),
            prompted,
        }
    }

    #[test]
    fn counts_each_outcome() {
        let mut stats = RunStats::default();
        stats.add_resolution(&Resolution::Cached {
            file_name: "a.mkv".to_string(),
            record: MovieRecord::default(),
        });
        stats.add_resolution(&matched(true, false));
        stats.add_resolution(&matched(false, true));
        stats.add_resolution(&Resolution::Skipped {
            file_name: "b.mkv".to_string(),
            reason: SkipReason::Operator,
        });
        stats.add_resolution(&Resolution::Skipped {
            file_name: "c.mkv".to_string(),
            reason: SkipReason::QueryLimit,
        });
        stats.add_failure();

        assert_eq!(stats.files_cached, 1);
        assert_eq!(stats.files_matched, 2);
        assert_eq!(stats.files_renamed, 1);
        assert_eq!(stats.files_prompted, 1);
        assert_eq!(stats.total_skipped(), 2);
        assert_eq!(stats.total_resolved(), 3);
        assert_eq!(stats.files_failed, 1);
    }
}
