//! Access to the chain node.
//!
//! [`ChainSource`] is the seam the restore operation depends on;
//! [`CatapultClient`] implements it over a node's REST API.

pub mod catapult;

pub use catapult::{
    CatapultClient, CatapultClientConfig, DEFAULT_MAX_METADATA_PAGES, MAX_METADATA_PAGE_SIZE,
    NetworkProperties,
};

use crate::Result;
use crate::metadata::MetadataEntry;
use async_trait::async_trait;
use serde_json::Value;

/// Metadata attached to one mosaic: the parsed entries plus each response
/// page exactly as the node sent it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataSnapshot {
    pub entries: Vec<MetadataEntry>,
    pub raw_pages: Vec<Value>,
}

#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Complete metadata set attached to a mosaic, raw pages included.
    async fn fetch_metadata(&self, mosaic_id: &str) -> Result<MetadataSnapshot>;

    /// Complete metadata entry set attached to a mosaic.
    async fn fetch_metadata_entries(&self, mosaic_id: &str) -> Result<Vec<MetadataEntry>> {
        Ok(self.fetch_metadata(mosaic_id).await?.entries)
    }

    /// Raw record of one confirmed transaction.
    async fn fetch_transaction(&self, reference: &str) -> Result<Value>;
}
