use crate::error::{ComsaError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub const METADATA_RESPONSE_FILE: &str = "mosaic_metadata.json";

/// ResponseArchive keeps copies of the raw node responses used in a restore.
/// Layout: {base}/{mosaic_id}/mosaic_metadata.json for the first `/metadata`
/// page, {base}/{mosaic_id}/mosaic_metadata_{page}.json for later pages and
/// {base}/{mosaic_id}/transaction_info_{index}.json
#[derive(Debug, Clone)]
pub struct ResponseArchive {
    base_path: PathBuf,
}

impl ResponseArchive {
    pub fn new(base_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Store one `/metadata` response page; `page_number` starts at 1.
    pub async fn save_metadata_page<T: Serialize + ?Sized>(
        &self,
        mosaic_id: &str,
        page_number: usize,
        page: &T,
    ) -> Result<PathBuf> {
        let path = self
            .mosaic_dir(mosaic_id)?
            .join(metadata_file_name(page_number));
        self.write_json(&path, page).await?;
        Ok(path)
    }

    pub async fn save_transaction<T: Serialize + ?Sized>(
        &self,
        mosaic_id: &str,
        index: usize,
        record: &T,
    ) -> Result<PathBuf> {
        let path = self
            .mosaic_dir(mosaic_id)?
            .join(transaction_file_name(index));
        self.write_json(&path, record).await?;
        Ok(path)
    }

    /// List archived file names for a mosaic
    pub async fn list(&self, mosaic_id: &str) -> Result<Vec<String>> {
        let dir = self.mosaic_dir(mosaic_id)?;

        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let data = serde_json::to_vec(value)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to temporary file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, path).await?;

        tracing::debug!("Archived {} bytes to {:?}", data.len(), path);
        Ok(())
    }

    fn mosaic_dir(&self, mosaic_id: &str) -> Result<PathBuf> {
        if mosaic_id.is_empty() || !mosaic_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ComsaError::InvalidRequest(format!(
                "invalid mosaic id for archive: {}",
                mosaic_id
            )));
        }
        Ok(self.base_path.join(mosaic_id))
    }
}

pub fn metadata_file_name(page_number: usize) -> String {
    if page_number <= 1 {
        METADATA_RESPONSE_FILE.to_string()
    } else {
        format!("mosaic_metadata_{}.json", page_number)
    }
}

pub fn transaction_file_name(index: usize) -> String {
    format!("transaction_info_{}.json", index)
}
