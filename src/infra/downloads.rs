//! The browser's download directory.
//!
//! The directory is shared with anything else on the machine that saves CSVs there. New
//! exports are detected by file count and picked by timestamp, so an unrelated CSV landing
//! during an export can be mistaken for it. That hazard is logged, not handled.

use crate::constants::CSV_EXTENSION;
use crate::error::{Result, ScraperError};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DownloadDir {
    path: PathBuf,
}

impl DownloadDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All `*.csv` files directly inside the directory.
    pub fn csv_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(CSV_EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }

    pub fn count_csv(&self) -> Result<usize> {
        let count = self.csv_files()?.len();
        debug!("Checking for CSV files... Found {} files", count);
        Ok(count)
    }

    /// Poll every `interval` until the CSV count exceeds `previous`, for at most `timeout`.
    ///
    /// Returns whether a new file appeared in time.
    pub async fn wait_for_new_csv(
        &self,
        previous: usize,
        interval: Duration,
        timeout: Duration,
    ) -> Result<bool> {
        let started = Instant::now();
        let mut elapsed = Duration::ZERO;
        while elapsed < timeout {
            sleep(interval).await;
            elapsed += interval;
            let current = self.count_csv()?;
            if current > previous {
                if current > previous + 1 {
                    warn!(
                        "{} new CSV files appeared in {} during one export; the newest will be used",
                        current - previous,
                        self.path.display()
                    );
                }
                metrics::histogram!("hitting_download_wait_seconds")
                    .record(started.elapsed().as_secs_f64());
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The CSV with the newest creation time (modification time where creation is unrecorded).
    pub fn latest_csv(&self) -> Result<Option<PathBuf>> {
        let mut latest: Option<(SystemTime, PathBuf)> = None;
        for path in self.csv_files()? {
            let meta = fs::metadata(&path)?;
            let stamp = meta.created().or_else(|_| meta.modified())?;
            if latest.as_ref().map_or(true, |(best, _)| stamp > *best) {
                latest = Some((stamp, path));
            }
        }
        Ok(latest.map(|(_, path)| path))
    }

    /// Rename the latest CSV to `new_name`. An existing file at the target is deleted first.
    pub fn rename_latest_csv(&self, new_name: &str) -> Result<PathBuf> {
        let latest = self.latest_csv()?.ok_or_else(|| ScraperError::NoCsvFound {
            dir: self.path.clone(),
        })?;
        let target = self.path.join(new_name);

        if latest == target {
            info!("'{}' is already the latest export", target.display());
            return Ok(target);
        }

        if target.exists() {
            info!("Overwriting existing '{}'", target.display());
            fs::remove_file(&target)?;
        }

        fs::rename(&latest, &target)?;
        info!("Renamed '{}' to '{}'", latest.display(), target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_counts_only_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.csv", "x");
        write(dir.path(), "b.csv", "x");
        write(dir.path(), "notes.txt", "x");
        fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let downloads = DownloadDir::new(dir.path());
        assert_eq!(downloads.count_csv().unwrap(), 2);
    }

    #[test]
    fn test_rename_picks_newest_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "old.csv", "old");
        thread::sleep(Duration::from_millis(20));
        write(dir.path(), "FanGraphs Leaderboard.csv", "new");

        let downloads = DownloadDir::new(dir.path());
        let renamed = downloads.rename_latest_csv("Hitting_2025-03-01_to_2025-04-17.csv").unwrap();

        assert_eq!(fs::read_to_string(&renamed).unwrap(), "new");
        assert!(dir.path().join("old.csv").exists());
        assert!(!dir.path().join("FanGraphs Leaderboard.csv").exists());
    }

    #[test]
    fn test_rename_overwrites_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = "Hitting_2025-03-01_to_2025-04-17.csv";
        write(dir.path(), target, "stale");
        thread::sleep(Duration::from_millis(20));
        write(dir.path(), "export.csv", "fresh");

        let downloads = DownloadDir::new(dir.path());
        downloads.rename_latest_csv(target).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join(target)).unwrap(), "fresh");
        assert_eq!(downloads.count_csv().unwrap(), 1);
    }

    #[test]
    fn test_rename_to_own_name_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = "Hitting_2025-03-01_to_2025-04-17.csv";
        write(dir.path(), "older.csv", "older");
        thread::sleep(Duration::from_millis(20));
        write(dir.path(), target, "latest");

        let downloads = DownloadDir::new(dir.path());
        let renamed = downloads.rename_latest_csv(target).unwrap();

        assert_eq!(renamed, dir.path().join(target));
        assert_eq!(fs::read_to_string(&renamed).unwrap(), "latest");
        assert_eq!(downloads.count_csv().unwrap(), 2);
    }

    #[test]
    fn test_rename_with_no_csv_reports_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = DownloadDir::new(dir.path()).rename_latest_csv("x.csv").unwrap_err();
        assert!(matches!(err, ScraperError::NoCsvFound { .. }));
    }

    #[tokio::test]
    async fn test_wait_times_out_without_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let downloads = DownloadDir::new(dir.path());
        let found = downloads
            .wait_for_new_csv(0, Duration::from_millis(5), Duration::from_millis(30))
            .await
            .unwrap();
        assert!(!found);
    }

    #[tokio::test]
    async fn test_wait_sees_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let downloads = DownloadDir::new(dir.path());
        let before = downloads.count_csv().unwrap();

        let path = dir.path().to_path_buf();
        let writer = tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            fs::write(path.join("export.csv"), "x").unwrap();
        });

        let found = downloads
            .wait_for_new_csv(before, Duration::from_millis(5), Duration::from_secs(2))
            .await
            .unwrap();
        writer.await.unwrap();
        assert!(found);
    }
}
