use crate::error::Result;
use crate::models::{DownloadOutcome, DownloadStatus, ImageRecord};
use crate::storage::ImageStorage;
use crate::traits::ImageSource;
use indicatif::ProgressBar;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Attempt/success counters shared by every download task of a run.
#[derive(Debug, Default)]
pub struct DownloadStats {
    attempted: AtomicUsize,
    succeeded: AtomicUsize,
}

impl DownloadStats {
    /// Returns the 1-based attempt number
    pub fn record_success(&self) -> usize {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.attempted.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Returns the 1-based attempt number
    pub fn record_failure(&self) -> usize {
        self.attempted.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn attempted(&self) -> usize {
        self.attempted.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.attempted().saturating_sub(self.succeeded())
    }
}

pub struct ImageDownloader {
    source: Arc<dyn ImageSource>,
    storage: ImageStorage,
    stats: Arc<DownloadStats>,
    progress: ProgressBar,
}

impl ImageDownloader {
    pub fn new(source: Arc<dyn ImageSource>, storage: ImageStorage, progress: ProgressBar) -> Self {
        Self {
            source,
            storage,
            stats: Arc::new(DownloadStats::default()),
            progress,
        }
    }

    pub fn stats(&self) -> Arc<DownloadStats> {
        Arc::clone(&self.stats)
    }

    /// Downloads one image into the storage directory. Never fails: errors are counted,
    /// logged and reported in the returned outcome.
    pub async fn download(&self, record: &ImageRecord) -> DownloadOutcome {
        let path = self.storage.image_path(record);

        let outcome = match self.fetch_and_save(record, &path).await {
            Ok(bytes) => {
                let index = self.stats.record_success();
                info!("{}: saving {} done.", index, path.display());
                DownloadOutcome {
                    index,
                    path,
                    source_url: record.source_url.clone(),
                    status: DownloadStatus::Saved { bytes },
                }
            }
            Err(e) => {
                let index = self.stats.record_failure();
                warn!("{}: saving {} failed. url: {}", index, path.display(), record.source_url);
                warn!("\ttip: {}", e);
                DownloadOutcome {
                    index,
                    path,
                    source_url: record.source_url.clone(),
                    status: DownloadStatus::Failed { reason: e.to_string() },
                }
            }
        };

        self.progress.inc(1);
        outcome
    }

    async fn fetch_and_save(&self, record: &ImageRecord, path: &Path) -> Result<usize> {
        let data = self.source.fetch_image(&record.source_url).await?;
        self.storage.write(path, &data).await?;
        Ok(data.len())
    }
}
