use crate::error::Result;

/// Network side of the crawl: result pages and image bodies
#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch one search results page as text
    async fn fetch_page(&self, url: &str) -> Result<String>;

    /// Fetch the raw bytes of one image
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}
