use crate::config::{Config, CrawlerConfig};
use crate::dedup::deduplicate;
use crate::downloader::{DownloadStats, ImageDownloader};
use crate::error::{CrawlerError, Result};
use crate::extractor::Extractor;
use crate::models::{CrawlSummary, DownloadOutcome, DownloadStatus, FailedDownload, ImageRecord};
use crate::pool::WorkerPool;
use crate::storage::ImageStorage;
use crate::traits::ImageSource;
use chrono::Utc;
use futures::FutureExt;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Number of result pages to request for `amount` images.
///
/// Over-fetches by half plus one page since neighbouring pages repeat images.
pub fn page_count(amount: usize, per_page: usize) -> Result<usize> {
    let per_page = per_page.max(1);
    let too_large = || CrawlerError::invalid_argument(format!("{} images at {} per page is too large", amount, per_page));

    // ceil(amount / per_page * 1.5) without going through floats
    let scaled = amount.checked_mul(3).ok_or_else(too_large)?;
    let divisor = per_page.checked_mul(2).ok_or_else(too_large)?;
    let pages = scaled.checked_add(divisor - 1).ok_or_else(too_large)? / divisor;
    pages.checked_add(1).ok_or_else(too_large)
}

/// Renders one search URL per page.
///
/// Placeholders: `{}` (keyword, offset, count in that order), `{0}`..`{2}`, or
/// `{keyword}`, `{offset}`, `{count}`.
pub fn page_urls(template: &str, keyword: &str, pages: usize, per_page: usize) -> Result<Vec<String>> {
    let placeholder = Regex::new(r"\{([A-Za-z0-9_]*)\}")?;
    let keyword: String = url::form_urlencoded::byte_serialize(keyword.as_bytes()).collect();

    (0..pages)
        .map(|page| {
            let offset = page
                .checked_mul(per_page)
                .ok_or_else(|| CrawlerError::invalid_argument(format!("result offset for page {} overflows", page)))?
                .to_string();
            let count = per_page.to_string();
            render_template(&placeholder, template, [keyword.as_str(), offset.as_str(), count.as_str()])
        })
        .collect()
}

fn render_template(placeholder: &Regex, template: &str, values: [&str; 3]) -> Result<String> {
    let mut rendered = String::with_capacity(template.len() + 32);
    let mut last = 0;
    let mut next_positional = 0;

    for found in placeholder.find_iter(template) {
        rendered.push_str(&template[last..found.start()]);
        last = found.end();

        let name = &found.as_str()[1..found.as_str().len() - 1];
        let slot = match name {
            "" => {
                next_positional += 1;
                next_positional - 1
            }
            "0" | "keyword" => 0,
            "1" | "offset" => 1,
            "2" | "count" => 2,
            other => return Err(CrawlerError::template(format!("unknown placeholder {{{}}}", other))),
        };

        let value = values
            .get(slot)
            .ok_or_else(|| CrawlerError::template("more than three positional placeholders"))?;
        rendered.push_str(value);
    }
    rendered.push_str(&template[last..]);

    let url = Url::parse(&rendered)?;
    Ok(url.into())
}

pub struct Crawler {
    config: CrawlerConfig,
    extractor: Extractor,
    source: Arc<dyn ImageSource>,
}

impl Crawler {
    pub fn new(config: &Config, source: Arc<dyn ImageSource>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config: config.crawler.clone(),
            extractor: Extractor::new(&config.selectors)?,
            source,
        })
    }

    /// Crawls result pages for `keyword` and downloads up to `amount` unique images.
    pub async fn run(&self, keyword: &str, amount: usize) -> Result<CrawlSummary> {
        if amount == 0 {
            return Err(CrawlerError::invalid_argument("amount must be at least 1"));
        }

        let started_at = Utc::now();
        let start = Instant::now();

        let storage = ImageStorage::new(&self.config.output_dir, self.config.disambiguate_filenames);
        storage.prepare().await?;

        let page_pool = WorkerPool::new("PAGE", self.config.page_workers)?;
        let download_pool = WorkerPool::new("DOWNLOAD", self.config.download_workers)?;

        let pages = page_count(amount, self.config.per_page)?;
        let urls = page_urls(&self.config.url_template, keyword, pages, self.config.per_page)?;
        info!("🔎 Searching '{}': {} page urls", keyword, urls.len());

        let bodies = self.fetch_pages(&page_pool, urls).await?;
        let pages_fetched = bodies.len();

        let records: Vec<ImageRecord> = bodies.iter().flat_map(|body| self.extractor.extract(body)).collect();
        let raw_records = records.len();
        info!("Records before deduplication: {}", raw_records);

        let mut records = deduplicate(records);
        let unique_records = records.len();
        info!("Records after deduplication: {}", unique_records);

        records.truncate(amount);
        let selected_records = records.len();
        info!("Records after split: {}", selected_records);

        info!(
            "⬇️ Downloading {} images to {:?} on {} workers",
            selected_records,
            storage.root(),
            download_pool.size()
        );
        let (mut outcomes, stats) = self.download_all(&download_pool, storage, records).await?;
        outcomes.sort_by_key(|outcome| outcome.index);
        debug!(
            "{} of {} downloads saved",
            outcomes.iter().filter(|outcome| outcome.is_saved()).count(),
            outcomes.len()
        );
        for outcome in &outcomes {
            debug!("{:?} -> {}", outcome.path, outcome.status);
        }

        let failures = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome.status {
                DownloadStatus::Failed { reason } => Some(FailedDownload {
                    path: outcome.path,
                    source_url: outcome.source_url,
                    reason,
                }),
                DownloadStatus::Saved { .. } => None,
            })
            .collect();

        let summary = CrawlSummary {
            keyword: keyword.to_string(),
            started_at,
            pages_requested: pages,
            pages_fetched,
            raw_records,
            unique_records,
            selected_records,
            attempted: stats.attempted(),
            succeeded: stats.succeeded(),
            failed: stats.failed(),
            elapsed_ms: start.elapsed().as_millis(),
            failures,
        };

        info!(
            "🎉 All done. {} successfully downloaded, {} failed.",
            summary.succeeded, summary.failed
        );
        Ok(summary)
    }

    /// Fetches every page; a page that fails contributes nothing.
    async fn fetch_pages(&self, pool: &WorkerPool, urls: Vec<String>) -> Result<Vec<String>> {
        let jobs = urls
            .into_iter()
            .map(|url| {
                let source = Arc::clone(&self.source);
                async move {
                    match source.fetch_page(&url).await {
                        Ok(body) => {
                            debug!("Fetched page {} ({} bytes)", url, body.len());
                            Some(body)
                        }
                        Err(e) => {
                            warn!("⚠️ Skipping page {}: {}", url, e);
                            None
                        }
                    }
                }
                .boxed()
            })
            .collect();

        Ok(pool.run_all(jobs).await?.into_iter().flatten().collect())
    }

    async fn download_all(
        &self,
        pool: &WorkerPool,
        storage: ImageStorage,
        records: Vec<ImageRecord>,
    ) -> Result<(Vec<DownloadOutcome>, Arc<DownloadStats>)> {
        let progress = self.progress_bar(records.len());
        let downloader = Arc::new(ImageDownloader::new(Arc::clone(&self.source), storage, progress.clone()));

        let jobs = records
            .into_iter()
            .map(|record| {
                let downloader = Arc::clone(&downloader);
                async move { downloader.download(&record).await }.boxed()
            })
            .collect();

        let outcomes = pool.run_all(jobs).await?;
        progress.finish_with_message("Download completed");

        Ok((outcomes, downloader.stats()))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.progress_bar {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }
}
