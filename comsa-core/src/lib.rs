//! Comsa Core - restores files stored as chunked messages on a Symbol chain
//!
//! A file is published as:
//! - base64 fragments `DDDDD#...` carried in aggregate transaction messages
//! - a JSON hash tag declaring the SHA-256 of the file
//! - mosaic metadata indexing those transactions under SHA3-derived keys

pub mod client;
pub mod error;
pub mod metadata;
pub mod operations;
pub mod reassembly;
pub mod storage;
pub mod transaction;

pub use client::{
    CatapultClient, CatapultClientConfig, ChainSource, MetadataSnapshot, NetworkProperties,
};
pub use error::{ComsaError, Result};
pub use metadata::{
    CatalogPages, ChunkCatalog, MetadataEntry, MetadataIndex, MetadataKey, MetadataSlot,
    resolve_catalog,
};
pub use operations::{
    DEFAULT_FETCH_DELAY, FetchPacer, RestoreAssetOperation, RestoreAssetOperationRequest,
    RestoreAssetOperationResult,
};
pub use reassembly::{MessageRecord, RestoredFile, compute_hash, reassemble, verify_hash};
pub use storage::ResponseArchive;
pub use transaction::{decode_message, extract_messages};
