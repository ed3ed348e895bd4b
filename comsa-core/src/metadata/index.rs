use crate::error::{ComsaError, Result};
use crate::metadata::key::{MetadataKey, MetadataSlot};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One key/value row of mosaic metadata, as returned by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEntry {
    pub scoped_metadata_key: String,
    /// Hex encoded value bytes.
    pub value: String,
}

impl MetadataEntry {
    pub fn new(scoped_metadata_key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            scoped_metadata_key: scoped_metadata_key.into(),
            value: value.into(),
        }
    }

    /// Build an entry whose value is the hex form of `text`.
    pub fn with_text(scoped_metadata_key: impl Into<String>, text: &str) -> Self {
        Self::new(scoped_metadata_key, hex::encode_upper(text.as_bytes()))
    }
}

/// Read-only view over a snapshot of one asset's metadata entries.
#[derive(Debug, Clone, Copy)]
pub struct MetadataIndex<'a> {
    entries: &'a [MetadataEntry],
}

impl<'a> MetadataIndex<'a> {
    pub fn new(entries: &'a [MetadataEntry]) -> Self {
        Self { entries }
    }

    /// Resolve a label to the raw bytes of its unique entry.
    pub fn resolve_unique(&self, label: &str) -> Result<Vec<u8>> {
        self.resolve(&MetadataSlot::label(label))
    }

    pub fn resolve(&self, slot: &MetadataSlot) -> Result<Vec<u8>> {
        let key = slot.key();
        let entry = self.find_unique(slot, key)?;

        hex::decode(entry.value.trim()).map_err(|error| {
            ComsaError::PayloadDecode(format!(
                "metadata value for slot {} (key {}) is not hex: {}",
                slot, key, error
            ))
        })
    }

    pub fn resolve_text(&self, slot: &MetadataSlot) -> Result<String> {
        let bytes = self.resolve(slot)?;
        String::from_utf8(bytes).map_err(|error| {
            ComsaError::PayloadDecode(format!(
                "metadata value for slot {} is not UTF-8: {}",
                slot, error
            ))
        })
    }

    pub fn resolve_json<T: DeserializeOwned>(&self, slot: &MetadataSlot) -> Result<T> {
        let text = self.resolve_text(slot)?;
        serde_json::from_str(&text).map_err(|error| {
            ComsaError::PayloadDecode(format!(
                "metadata value for slot {} is not valid JSON: {}",
                slot, error
            ))
        })
    }

    fn find_unique(&self, slot: &MetadataSlot, key: MetadataKey) -> Result<&'a MetadataEntry> {
        let mut matches = self
            .entries
            .iter()
            .filter(|entry| key.suffix_matches(&entry.scoped_metadata_key));

        let Some(first) = matches.next() else {
            return Err(ComsaError::MetadataKeyNotFound {
                slot: slot.to_string(),
                key: key.to_hex(),
            });
        };

        let extra = matches.count();
        if extra > 0 {
            return Err(ComsaError::MetadataKeyAmbiguous {
                slot: slot.to_string(),
                key: key.to_hex(),
                matches: extra + 1,
            });
        }

        Ok(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_for(label: &str, text: &str) -> MetadataEntry {
        MetadataEntry::with_text(MetadataKey::derive(label).to_hex(), text)
    }

    #[test]
    fn test_resolve_unique() {
        let entries = vec![entry_for("nft", r#"{"name":"x"}"#), entry_for("data1", "[]")];
        let index = MetadataIndex::new(&entries);

        let bytes = index.resolve_unique("nft").unwrap();
        assert_eq!(bytes, br#"{"name":"x"}"#.to_vec());
    }

    #[test]
    fn test_resolve_not_found() {
        let entries = vec![entry_for("nft", "{}")];
        let index = MetadataIndex::new(&entries);

        match index.resolve_unique("data1") {
            Err(ComsaError::MetadataKeyNotFound { slot, key }) => {
                assert_eq!(slot, "'data1'");
                assert_eq!(key, "D77BFE313AF3EF1F");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_ignores_lowercase_key() {
        let entries = vec![MetadataEntry::with_text("5a030aa7795ebe75", "{}")];
        let index = MetadataIndex::new(&entries);

        assert!(matches!(
            index.resolve_unique("nft"),
            Err(ComsaError::MetadataKeyNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_leading_digit_differs() {
        // Same tail as the derived key for "nft", different first digit.
        let entries = vec![MetadataEntry::with_text("DA030AA7795EBE75", "hello")];
        let index = MetadataIndex::new(&entries);

        assert_eq!(index.resolve_unique("nft").unwrap(), b"hello".to_vec());
    }

    #[test]
    fn test_resolve_ambiguous() {
        let entries = vec![
            MetadataEntry::with_text("5A030AA7795EBE75", "a"),
            MetadataEntry::with_text("DA030AA7795EBE75", "b"),
        ];
        let index = MetadataIndex::new(&entries);

        match index.resolve_unique("nft") {
            Err(ComsaError::MetadataKeyAmbiguous { matches, key, .. }) => {
                assert_eq!(matches, 2);
                assert_eq!(key, "5A030AA7795EBE75");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_raw_key_slot() {
        let entries = vec![MetadataEntry::with_text("FE58A23DBB642C67", "12")];
        let index = MetadataIndex::new(&entries);
        let slot = MetadataSlot::Key(MetadataKey::from_hex("FE58A23DBB642C67").unwrap());

        assert_eq!(index.resolve_text(&slot).unwrap(), "12");
    }

    #[test]
    fn test_resolve_bad_payloads() {
        let entries = vec![
            MetadataEntry::new(MetadataKey::derive("a").to_hex(), "zz"),
            MetadataEntry::new(MetadataKey::derive("b").to_hex(), "FF"),
            entry_for("c", "{not json"),
        ];
        let index = MetadataIndex::new(&entries);

        assert!(matches!(
            index.resolve_unique("a"),
            Err(ComsaError::PayloadDecode(_))
        ));
        assert!(matches!(
            index.resolve_text(&MetadataSlot::label("b")),
            Err(ComsaError::PayloadDecode(_))
        ));
        assert!(matches!(
            index.resolve_json::<serde_json::Value>(&MetadataSlot::label("c")),
            Err(ComsaError::PayloadDecode(_))
        ));
    }

    #[test]
    fn test_entry_deserializes_from_node_shape() {
        let raw = r#"{"scopedMetadataKey":"5A030AA7795EBE75","value":"7B7D","valueSize":2}"#;
        let entry: MetadataEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.scoped_metadata_key, "5A030AA7795EBE75");
        assert_eq!(entry.value, "7B7D");
    }
}
