//! Storage modules for Comsa
//!
//! Provides the on-disk archive of raw node responses.

pub mod response_archive;

pub use response_archive::{
    METADATA_RESPONSE_FILE, ResponseArchive, metadata_file_name, transaction_file_name,
};
