use crate::error::{ComsaError, Result};
use crate::metadata::index::{MetadataEntry, MetadataIndex};
use crate::metadata::key::{MetadataKey, MetadataSlot};
use serde_json::Value;

/// Label of the slot holding the asset descriptor.
pub const DESCRIPTOR_LABEL: &str = "nft";

/// Prefix of the reference page labels: `data1`, `data2`, ...
pub const PAGE_LABEL_PREFIX: &str = "data";

/// Raw key of the slot holding the declared number of transaction references.
/// The label it was derived from is not known, so the key is used directly.
pub const REFERENCE_COUNT_KEY: MetadataKey = MetadataKey(0xFE58_A23D_BB64_2C67);

pub fn page_label(page_index: usize) -> String {
    format!("{}{}", PAGE_LABEL_PREFIX, page_index)
}

/// Everything recovered from an asset's metadata before any transaction is
/// fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkCatalog {
    pub descriptor: Value,
    pub expected_count: usize,
    pub references: Vec<String>,
    pub page_count: usize,
}

/// Resolve the descriptor, the declared reference count and the ordered
/// transaction reference list from a metadata snapshot.
pub fn resolve_catalog(entries: &[MetadataEntry]) -> Result<ChunkCatalog> {
    let index = MetadataIndex::new(entries);

    let descriptor: Value = index.resolve_json(&MetadataSlot::label(DESCRIPTOR_LABEL))?;

    let count_slot = MetadataSlot::Key(REFERENCE_COUNT_KEY);
    let count_text = index.resolve_text(&count_slot)?;
    let expected_count = count_text.trim().parse::<usize>().map_err(|error| {
        ComsaError::PayloadDecode(format!(
            "reference count in slot {} is not an integer: '{}' ({})",
            count_slot, count_text, error
        ))
    })?;

    // The declared count is untrusted, so it never sizes an allocation.
    let mut references = Vec::new();
    let mut page_count = 0usize;
    for page in CatalogPages::new(index) {
        let page = page?;
        page_count += 1;
        references.extend(page);
    }

    tracing::debug!(
        "catalog resolved: pages={} references={} declared={}",
        page_count,
        references.len(),
        expected_count
    );

    if references.len() != expected_count {
        return Err(ComsaError::ReferenceCountMismatch {
            expected: expected_count,
            actual: references.len(),
        });
    }

    Ok(ChunkCatalog {
        descriptor,
        expected_count,
        references,
        page_count,
    })
}

/// Lazy walk over the reference pages `data1`, `data2`, ...
///
/// The walk ends at the first page whose key is absent. Any other lookup or
/// decode failure is yielded once, after which the iterator is exhausted.
pub struct CatalogPages<'a> {
    index: MetadataIndex<'a>,
    next_page: usize,
    done: bool,
}

impl<'a> CatalogPages<'a> {
    pub fn new(index: MetadataIndex<'a>) -> Self {
        Self {
            index,
            next_page: 1,
            done: false,
        }
    }
}

impl Iterator for CatalogPages<'_> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let label = page_label(self.next_page);
        let page = self.index.resolve_json::<Vec<String>>(&MetadataSlot::label(label.as_str()));

        match page {
            Ok(references) => {
                tracing::debug!("page {} holds {} references", label, references.len());
                self.next_page += 1;
                Some(Ok(references))
            }
            Err(error) if error.is_not_found() => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

impl std::iter::FusedIterator for CatalogPages<'_> {}
