use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Normalized metadata for one image found on a results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub title: String,
    pub extension: String,
    pub content_hash: String,
    pub source_url: String,
}

/// Raw inline JSON attached to every result entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageMetadata {
    #[serde(rename = "t")]
    pub title: String,
    #[serde(rename = "murl")]
    pub media_url: String,
    #[serde(rename = "md5")]
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Saved { bytes: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    /// 1-based position in completion order
    pub index: usize,
    pub path: PathBuf,
    pub source_url: String,
    pub status: DownloadStatus,
}

impl DownloadOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self.status, DownloadStatus::Saved { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub keyword: String,
    pub started_at: DateTime<Utc>,
    pub pages_requested: usize,
    pub pages_fetched: usize,
    pub raw_records: usize,
    pub unique_records: usize,
    pub selected_records: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u128,
    pub failures: Vec<FailedDownload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDownload {
    pub path: PathBuf,
    pub source_url: String,
    pub reason: String,
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadStatus::Saved { bytes } => write!(f, "saved ({} bytes)", bytes),
            DownloadStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

impl std::fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Crawl summary for '{}'", self.keyword)?;
        writeln!(f, "  started:            {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "  pages:              {}/{} fetched", self.pages_fetched, self.pages_requested)?;
        writeln!(f, "  records found:      {}", self.raw_records)?;
        writeln!(f, "  after dedup:        {}", self.unique_records)?;
        writeln!(f, "  selected:           {}", self.selected_records)?;
        writeln!(f, "  downloads:          {} ok, {} failed, {} attempted", self.succeeded, self.failed, self.attempted)?;
        write!(f, "  elapsed:            {:.2}s", self.elapsed_ms as f64 / 1000.0)?;
        for failure in &self.failures {
            write!(f, "\n  failed: {} ({}): {}", failure.path.display(), failure.source_url, failure.reason)?;
        }
        Ok(())
    }
}
