use crate::error::{CrawlerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/85.0.4183.83 Safari/537.36";

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://www.bing.com/images/async?q={keyword}&first={offset}&count={count}&mmasync=1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub selectors: SelectorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Search page URL with keyword, offset and per-page count placeholders
    pub url_template: String,
    pub per_page: usize,
    pub page_workers: usize,
    pub download_workers: usize,
    pub output_dir: String,
    /// Append the content hash to file names so distinct images never overwrite each other
    pub disambiguate_filenames: bool,
    pub progress_bar: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub headers: HashMap<String, String>,
    pub connect_timeout_secs: u64,
    pub page_timeout_secs: u64,
    pub image_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorsConfig {
    /// CSS selector for the element carrying one image's metadata
    pub image_entry: String,
    /// Attribute holding the inline JSON metadata
    pub metadata_attr: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            per_page: 30,
            page_workers: 8,
            download_workers: 32,
            output_dir: ".".to_string(),
            disambiguate_filenames: false,
            progress_bar: true,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: HashMap::new(),
            connect_timeout_secs: 5,
            page_timeout_secs: 15,
            image_timeout_secs: 5,
        }
    }
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            image_entry: ".imgpt > a".to_string(),
            metadata_attr: "m".to_string(),
        }
    }
}

impl Config {
    /// Loads the optional TOML file at `path`, then applies `IMGCRAWL_*` environment
    /// overrides (`IMGCRAWL_CRAWLER__PER_PAGE=50`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(false))
            .add_source(
                ::config::Environment::with_prefix("IMGCRAWL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.crawler.per_page == 0 {
            return Err(CrawlerError::invalid_argument("per_page must be at least 1"));
        }
        if self.crawler.page_workers == 0 || self.crawler.download_workers == 0 {
            return Err(CrawlerError::invalid_argument("worker counts must be at least 1"));
        }
        if self.selectors.image_entry.trim().is_empty() || self.selectors.metadata_attr.trim().is_empty() {
            return Err(CrawlerError::invalid_argument("selectors must not be empty"));
        }
        Ok(())
    }
}
