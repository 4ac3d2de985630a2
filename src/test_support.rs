use crate::error::{CrawlerError, Result};
use crate::models::ImageRecord;
use crate::traits::ImageSource;
use std::collections::hash_map::RandomState;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory `ImageSource` with optional random latency
#[derive(Default)]
pub struct StubSource {
    pub pages: HashMap<String, String>,
    pub failing_pages: HashSet<String>,
    pub failing_images: HashSet<String>,
    pub max_delay_ms: u64,
    pub page_requests: AtomicUsize,
    pub image_requests: AtomicUsize,
    jitter: RandomState,
}

impl StubSource {
    pub fn with_delay(max_delay_ms: u64) -> Self {
        Self {
            max_delay_ms,
            ..Self::default()
        }
    }

    async fn pause(&self, url: &str) {
        if self.max_delay_ms > 0 {
            let millis = self.jitter.hash_one(url) % (self.max_delay_ms + 1);
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

#[async_trait::async_trait]
impl ImageSource for StubSource {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        self.pause(url).await;
        if self.failing_pages.contains(url) {
            return Err(CrawlerError::scraping(format!("connection reset: {}", url)));
        }
        Ok(self.pages.get(url).cloned().unwrap_or_default())
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        self.image_requests.fetch_add(1, Ordering::SeqCst);
        self.pause(url).await;
        if self.failing_images.contains(url) {
            return Err(CrawlerError::scraping(format!("timed out: {}", url)));
        }
        Ok(url.as_bytes().to_vec())
    }
}

pub fn record(title: &str, hash: &str, url: &str) -> ImageRecord {
    ImageRecord {
        title: title.to_string(),
        extension: "png".to_string(),
        content_hash: hash.to_string(),
        source_url: url.to_string(),
    }
}

/// One results-page entry in the markup layout the extractor reads
pub fn result_entry(title: &str, murl: &str, md5: &str) -> String {
    let m = serde_json::json!({ "t": title, "murl": murl, "md5": md5 });
    format!(
        r#"<div class="imgpt"><a class="iusc" m="{}"><img src="thumb"></a></div>"#,
        m.to_string().replace('&', "&amp;").replace('"', "&quot;")
    )
}

pub fn results_page(entries: &[String]) -> String {
    format!("<html><body><div id=\"mmComponent\">{}</div></body></html>", entries.concat())
}
