use crate::error::{ComsaError, Result};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// Number of trailing hex digits compared when matching scoped metadata keys.
///
/// Keys published by the minting tool occasionally differ from the locally
/// derived key in the leading digit, so only the tail is significant.
pub const KEY_MATCH_SUFFIX_LEN: usize = 15;

/// Width of the canonical hex form of a metadata key.
pub const KEY_HEX_LEN: usize = 16;

/// 64-bit scoped metadata key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataKey(pub u64);

impl MetadataKey {
    /// Derive a key from a human readable label: the first 8 bytes of the
    /// SHA3-256 digest of the label, read as a little-endian integer.
    pub fn derive(label: &str) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(label.as_bytes());
        let digest = hasher.finalize();

        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Self(u64::from_le_bytes(head))
    }

    /// Uppercase hex, zero padded to 16 digits.
    pub fn to_hex(&self) -> String {
        format!("{:016X}", self.0)
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let trimmed = hex.trim();
        if trimmed.is_empty() || trimmed.len() > KEY_HEX_LEN {
            return Err(ComsaError::KeyFormat(format!(
                "expected 1..={} hex digits, got '{}'",
                KEY_HEX_LEN, hex
            )));
        }

        u64::from_str_radix(trimmed, 16)
            .map(Self)
            .map_err(|error| ComsaError::KeyFormat(format!("'{}': {}", hex, error)))
    }

    /// Compare against a scoped key as stored on chain, looking only at the
    /// last [`KEY_MATCH_SUFFIX_LEN`] hex digits of both sides. The digits are
    /// compared exactly, so a lowercase rendering never matches.
    pub fn suffix_matches(&self, scoped_key_hex: &str) -> bool {
        let own = self.to_hex();
        match (hex_suffix(&own), hex_suffix(scoped_key_hex)) {
            (Some(own), Some(other)) => own == other,
            _ => false,
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn hex_suffix(value: &str) -> Option<&str> {
    if !value.is_ascii() || value.len() < KEY_MATCH_SUFFIX_LEN {
        return None;
    }
    Some(&value[value.len() - KEY_MATCH_SUFFIX_LEN..])
}

/// A metadata slot is either addressed by a label, or by a raw key whose
/// label is not known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSlot {
    Label(String),
    Key(MetadataKey),
}

impl MetadataSlot {
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    pub fn key(&self) -> MetadataKey {
        match self {
            Self::Label(label) => MetadataKey::derive(label),
            Self::Key(key) => *key,
        }
    }
}

impl fmt::Display for MetadataSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "'{}'", label),
            Self::Key(key) => write!(f, "raw:{}", key),
        }
    }
}
