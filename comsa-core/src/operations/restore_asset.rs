use crate::{
    ChainSource, ChunkCatalog, ComsaError, ResponseArchive, RestoredFile, Result,
    extract_messages, reassemble, resolve_catalog,
};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default spacing between transaction fetches against public nodes.
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct RestoreAssetOperation {
    source: Arc<dyn ChainSource>,
    archive: Option<Arc<ResponseArchive>>,
}

#[derive(Debug, Clone)]
pub struct RestoreAssetOperationRequest {
    pub mosaic_id: String,
    pub fetch_delay: Duration,
    pub max_concurrent_fetches: usize,
}

impl RestoreAssetOperationRequest {
    pub fn new(mosaic_id: impl Into<String>) -> Self {
        Self {
            mosaic_id: mosaic_id.into(),
            fetch_delay: DEFAULT_FETCH_DELAY,
            max_concurrent_fetches: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestoreAssetOperationResult {
    pub mosaic_id: String,
    pub descriptor: Value,
    pub references: Vec<String>,
    pub message_count: usize,
    pub file: RestoredFile,
}

impl RestoreAssetOperation {
    pub fn new(source: Arc<dyn ChainSource>) -> Self {
        Self {
            source,
            archive: None,
        }
    }

    pub fn with_archive(mut self, archive: Arc<ResponseArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Fetch the mosaic's metadata and resolve its chunk catalog without
    /// touching any transaction.
    pub async fn resolve_catalog(&self, mosaic_id: &str) -> Result<ChunkCatalog> {
        let mosaic_id = normalize_mosaic_id(mosaic_id)?;
        self.fetch_catalog(&mosaic_id).await
    }

    pub async fn run(
        &self,
        request: RestoreAssetOperationRequest,
    ) -> Result<RestoreAssetOperationResult> {
        let RestoreAssetOperationRequest {
            mosaic_id,
            fetch_delay,
            max_concurrent_fetches,
        } = request;

        let mosaic_id = normalize_mosaic_id(&mosaic_id)?;
        if max_concurrent_fetches == 0 {
            return Err(ComsaError::InvalidRequest(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }

        let catalog = self.fetch_catalog(&mosaic_id).await?;
        tracing::info!(
            "Catalog resolved. mosaic={} pages={} references={}",
            mosaic_id,
            catalog.page_count,
            catalog.references.len()
        );

        let messages = self
            .collect_messages(
                &mosaic_id,
                &catalog.references,
                fetch_delay,
                max_concurrent_fetches,
            )
            .await?;

        let file = reassemble(&messages)?;
        tracing::info!(
            "Restored mosaic={} bytes={} sha256={}",
            mosaic_id,
            file.bytes.len(),
            file.file_hash
        );

        Ok(RestoreAssetOperationResult {
            mosaic_id,
            descriptor: catalog.descriptor,
            references: catalog.references,
            message_count: messages.len(),
            file,
        })
    }

    async fn fetch_catalog(&self, mosaic_id: &str) -> Result<ChunkCatalog> {
        tracing::info!("Fetching mosaic metadata. mosaic={}", mosaic_id);
        let snapshot = self.source.fetch_metadata(mosaic_id).await?;

        if let Some(archive) = &self.archive {
            for (index, page) in snapshot.raw_pages.iter().enumerate() {
                archive.save_metadata_page(mosaic_id, index + 1, page).await?;
            }
        }

        resolve_catalog(&snapshot.entries)
    }

    async fn collect_messages(
        &self,
        mosaic_id: &str,
        references: &[String],
        fetch_delay: Duration,
        max_concurrent_fetches: usize,
    ) -> Result<Vec<String>> {
        let pacer = FetchPacer::new(fetch_delay);
        let pacer = &pacer;
        let source = &self.source;
        let archive = self.archive.as_deref();
        let total = references.len();

        let batches: Vec<Vec<String>> = stream::iter(references.iter().enumerate())
            .map(move |(index, reference)| async move {
                pacer.wait_turn().await;
                tracing::info!(
                    "Fetching transaction {}/{} reference={}",
                    index + 1,
                    total,
                    reference
                );

                let record = source.fetch_transaction(reference).await?;
                if let Some(archive) = archive {
                    archive.save_transaction(mosaic_id, index, &record).await?;
                }

                let messages = extract_messages(reference, &record)?;
                tracing::debug!(
                    "transaction {} carried {} messages",
                    reference,
                    messages.len()
                );
                Ok::<_, ComsaError>(messages)
            })
            .buffered(max_concurrent_fetches)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}

/// Spaces the start of successive fetches by a fixed delay. Turns are
/// granted in the order callers first ask for them.
pub struct FetchPacer {
    delay: Duration,
    next_start: Mutex<Option<Instant>>,
}

impl FetchPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_start: Mutex::new(None),
        }
    }

    pub async fn wait_turn(&self) {
        if self.delay.is_zero() {
            return;
        }

        let mut next_start = self.next_start.lock().await;
        if let Some(at) = *next_start {
            tokio::time::sleep_until(at).await;
        }
        *next_start = Some(Instant::now() + self.delay);
    }
}

fn normalize_mosaic_id(mosaic_id: &str) -> Result<String> {
    let trimmed = mosaic_id.trim();
    if trimmed.is_empty() {
        return Err(ComsaError::InvalidRequest(
            "mosaic id cannot be empty".to_string(),
        ));
    }

    if trimmed.len() > 16 || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ComsaError::InvalidRequest(format!(
            "mosaic id must be at most 16 hex digits: {}",
            mosaic_id
        )));
    }

    Ok(trimmed.to_ascii_uppercase())
}
