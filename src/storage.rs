use crate::error::Result;
use crate::extractor::{sanitize_title, FALLBACK_EXTENSION};
use crate::models::ImageRecord;
use std::path::{Path, PathBuf};
use tracing::info;

const FALLBACK_STEM: &str = "image";

/// Destination directory for downloaded images.
#[derive(Debug, Clone)]
pub struct ImageStorage {
    root: PathBuf,
    disambiguate: bool,
}

impl ImageStorage {
    pub fn new(root: impl Into<PathBuf>, disambiguate: bool) -> Self {
        Self {
            root: root.into(),
            disambiguate,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the destination directory if it doesn't exist
    pub async fn prepare(&self) -> Result<()> {
        if !tokio::fs::try_exists(&self.root).await.unwrap_or(false) {
            info!("Creating output directory: {:?}", self.root);
        }
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// `<title>.<extension>`, or `<title>_<hash>.<extension>` when disambiguating.
    ///
    /// Every component is reduced to alphanumerics, so the file always lands directly in
    /// the root. Two records with the same title overwrite each other unless disambiguation
    /// is on.
    pub fn image_path(&self, record: &ImageRecord) -> PathBuf {
        let title = sanitize_title(&record.title);
        let hash = sanitize_title(&record.content_hash);
        let extension = match sanitize_title(&record.extension) {
            ext if ext.is_empty() => FALLBACK_EXTENSION.to_string(),
            ext => ext,
        };

        let stem = match (title.is_empty(), hash.is_empty(), self.disambiguate) {
            (true, true, _) => FALLBACK_STEM.to_string(),
            (true, false, _) => hash,
            (false, false, true) => format!("{}_{}", title, hash),
            (false, _, _) => title,
        };
        self.root.join(format!("{}.{}", stem, extension))
    }

    pub async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tokio::fs::write(path, data).await?;
        Ok(())
    }
}
