//! Metadata addressing for Comsa
//!
//! Derives lookup keys from labels and resolves the chunk catalog from a
//! snapshot of mosaic metadata entries.

pub mod catalog;
pub mod index;
pub mod key;

pub use catalog::{
    CatalogPages, ChunkCatalog, DESCRIPTOR_LABEL, PAGE_LABEL_PREFIX, REFERENCE_COUNT_KEY,
    page_label, resolve_catalog,
};
pub use index::{MetadataEntry, MetadataIndex};
pub use key::{KEY_HEX_LEN, KEY_MATCH_SUFFIX_LEN, MetadataKey, MetadataSlot};
