use crate::config::SelectorsConfig;
use crate::error::{CrawlerError, Result};
use crate::models::{ImageMetadata, ImageRecord};
use scraper::{Html, Selector};
use tracing::{debug, warn};

/// Characters that are never allowed in a saved title
const IGNORE_CHARS: [&str; 11] = ["|", ".", ",", "", "/", "@", ":", ";", "[", "]", "+"];

/// Formats kept as the file extension; anything else is saved as `jpg`
const IMAGE_TYPES: [&str; 20] = [
    "bmp", "jpg", "png", "tif", "gif", "pcx", "tga", "exif", "fpx", "svg", "psd", "cdr", "pcd", "dxf", "ufo", "eps",
    "ai", "raw", "WMF", "webp",
];

pub const FALLBACK_EXTENSION: &str = "jpg";

pub struct Extractor {
    entry_selector: Selector,
    metadata_attr: String,
}

impl Extractor {
    pub fn new(config: &SelectorsConfig) -> Result<Self> {
        let entry_selector = Selector::parse(&config.image_entry)
            .map_err(|e| CrawlerError::scraping(format!("invalid selector '{}': {:?}", config.image_entry, e)))?;

        Ok(Self {
            entry_selector,
            metadata_attr: config.metadata_attr.clone(),
        })
    }

    /// Extracts every image record of a results page in document order.
    ///
    /// Entries whose metadata cannot be parsed are skipped on their own.
    pub fn extract(&self, html: &str) -> Vec<ImageRecord> {
        let document = Html::parse_document(html);

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for element in document.select(&self.entry_selector) {
            let Some(raw) = element.value().attr(&self.metadata_attr) else {
                continue;
            };

            match parse_entry(raw) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    warn!("[EXTRACTOR] Skipping malformed image entry: {}", e);
                }
            }
        }

        debug!("[EXTRACTOR] Extracted {} records ({} skipped)", records.len(), skipped);
        records
    }
}

pub fn parse_entry(raw: &str) -> Result<ImageRecord> {
    let metadata: ImageMetadata = serde_json::from_str(raw)?;

    Ok(ImageRecord {
        title: sanitize_title(&metadata.title),
        extension: image_extension(&metadata.media_url),
        content_hash: metadata.content_hash,
        source_url: metadata.media_url,
    })
}

pub fn sanitize_title(title: &str) -> String {
    let mut sanitized = title.to_string();
    for ignored in IGNORE_CHARS {
        if !ignored.is_empty() {
            sanitized = sanitized.replace(ignored, "");
        }
    }

    sanitized
        .chars()
        .filter(|c| !c.is_whitespace())
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn image_extension(url: &str) -> String {
    let candidate = url.rsplit('.').next().unwrap_or_default();
    if IMAGE_TYPES.contains(&candidate) {
        candidate.to_string()
    } else {
        FALLBACK_EXTENSION.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, murl: &str, md5: &str) -> String {
        let m = serde_json::json!({ "t": title, "murl": murl, "md5": md5, "purl": "https://example.com" });
        format!(
            r#"<div class="imgpt"><a class="iusc" m="{}" href="/images/search"><img src="thumb.jpg"></a></div>"#,
            m.to_string().replace('"', "&quot;")
        )
    }

    fn extractor() -> Extractor {
        Extractor::new(&SelectorsConfig::default()).unwrap()
    }

    #[test]
    fn extracts_records_in_document_order() {
        let html = format!(
            "<html><body>{}{}{}</body></html>",
            entry("iPad Pro | Apple", "https://img.example.com/a/ipad.png", "h1"),
            entry("iPad mini: review", "https://img.example.com/b/mini.webp", "h2"),
            entry("Old iPad", "https://img.example.com/c/old", "h3"),
        );

        let records = extractor().extract(&html);
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].title, "iPadProApple");
        assert_eq!(records[0].extension, "png");
        assert_eq!(records[0].content_hash, "h1");
        assert_eq!(records[0].source_url, "https://img.example.com/a/ipad.png");

        assert_eq!(records[1].title, "iPadminireview");
        assert_eq!(records[1].extension, "webp");
        assert_eq!(records[2].extension, "jpg");
    }

    #[test]
    fn malformed_entry_does_not_drop_the_page() {
        let html = format!(
            r#"<html><body>{}<div class="imgpt"><a m="{{not json"></a></div><div class="imgpt"><a m="{{&quot;t&quot;:&quot;no url&quot;}}"></a></div>{}</body></html>"#,
            entry("first", "https://x.example.com/1.gif", "a"),
            entry("last", "https://x.example.com/2.gif", "b"),
        );

        let records = extractor().extract(&html);
        let hashes: Vec<_> = records.iter().map(|r| r.content_hash.as_str()).collect();
        assert_eq!(hashes, vec!["a", "b"]);
    }

    #[test]
    fn entries_outside_the_selector_are_ignored() {
        let html = r#"<html><body>
            <div class="other"><a m="{&quot;t&quot;:&quot;x&quot;,&quot;murl&quot;:&quot;u.png&quot;,&quot;md5&quot;:&quot;z&quot;}"></a></div>
            <div class="imgpt"><a href="/no-metadata"></a></div>
        </body></html>"#;

        assert!(extractor().extract(html).is_empty());
    }

    #[test]
    fn sanitized_title_is_alphanumeric_and_idempotent() {
        let titles = [
            "iPad Pro 12.9\" (2021) | Apple Store",
            "  spaced\ttitle\n ",
            "a/b@c:d;e[f]g+h,i.j",
            "Café – 東京 ★ 2020",
            "",
            "|||...",
        ];

        for title in titles {
            let once = sanitize_title(title);
            assert!(once.chars().all(char::is_alphanumeric), "{:?} -> {:?}", title, once);
            assert_eq!(sanitize_title(&once), once);
        }

        assert_eq!(sanitize_title("a/b@c:d;e[f]g+h,i.j"), "abcdefghij");
        assert_eq!(sanitize_title("Café – 東京 ★ 2020"), "Café東京2020");
        assert_eq!(sanitize_title("|||..."), "");
    }

    #[test]
    fn unknown_extension_falls_back_to_jpg() {
        assert_eq!(image_extension("https://cdn.example.com/file.bin"), "jpg");
        assert_eq!(image_extension("https://cdn.example.com/file.png"), "png");
        assert_eq!(image_extension("https://cdn.example.com/vector.WMF"), "WMF");
        assert_eq!(image_extension("https://cdn.example.com/vector.wmf"), "jpg");
        assert_eq!(image_extension("https://cdn.example.com/photo.png?w=800"), "jpg");
        assert_eq!(image_extension("no-dot-at-all"), "jpg");
    }

    #[test]
    fn invalid_selector_is_a_setup_error() {
        let config = SelectorsConfig {
            image_entry: "[[[".to_string(),
            metadata_attr: "m".to_string(),
        };
        assert!(matches!(Extractor::new(&config), Err(CrawlerError::Scraping(_))));
    }
}
