use crate::config::HttpConfig;
use crate::error::{CrawlerError, Result};
use crate::traits::ImageSource;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    page_timeout: Duration,
    image_timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| CrawlerError::invalid_argument(format!("header name '{}': {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| CrawlerError::invalid_argument(format!("header '{}': {}", key, e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            page_timeout: Duration::from_secs(config.page_timeout_secs),
            image_timeout: Duration::from_secs(config.image_timeout_secs),
        })
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(self.page_timeout)
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;
        Ok(text)
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(self.image_timeout)
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl ImageSource for HttpClient {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        self.get_text(url).await
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        self.get_bytes(url).await
    }
}
