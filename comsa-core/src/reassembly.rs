use crate::error::{ComsaError, Result};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use bytes::Bytes;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Number of leading decimal digits carrying a fragment's sequence index.
pub const SEQUENCE_DIGITS: usize = 5;

/// Separator between the sequence index and the fragment payload.
pub const FRAGMENT_SEPARATOR: u8 = b'#';

/// Standard alphabet, padding optional, trailing bits tolerated. Only ever
/// fed text that [`decode_forgiving`] has already cleaned.
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// One message recovered from a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRecord {
    /// Declares the SHA-256 of the complete decoded file.
    HashTag { hash: String },
    /// A slice of the file's base64 text, `DDDDD#<payload>` on the wire.
    DataFragment { sequence_index: u32, payload: String },
}

#[derive(Deserialize)]
struct HashTagBody {
    hash: String,
}

impl MessageRecord {
    pub fn parse(message: &str) -> Result<Self> {
        let raw = message.as_bytes();
        let is_fragment = raw.len() > SEQUENCE_DIGITS
            && raw[..SEQUENCE_DIGITS].iter().all(u8::is_ascii_digit)
            && raw[SEQUENCE_DIGITS] == FRAGMENT_SEPARATOR;

        if is_fragment {
            // The first six bytes are ASCII, so slicing on them is safe.
            let sequence_index = message[..SEQUENCE_DIGITS].parse::<u32>().map_err(|error| {
                ComsaError::PayloadDecode(format!("bad fragment index in message: {}", error))
            })?;
            return Ok(Self::DataFragment {
                sequence_index,
                payload: message[SEQUENCE_DIGITS + 1..].to_string(),
            });
        }

        let body: HashTagBody = serde_json::from_str(message).map_err(|error| {
            ComsaError::PayloadDecode(format!(
                "message is neither a data fragment nor a hash tag ({}): {}",
                error,
                preview(message)
            ))
        })?;

        Ok(Self::HashTag { hash: body.hash })
    }
}

/// Verified output of [`reassemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredFile {
    pub bytes: Bytes,
    /// Lowercase hex SHA-256 of `bytes`.
    pub file_hash: String,
    pub fragment_count: usize,
}

/// Rebuild the original file from an unordered list of raw messages.
pub fn reassemble<S: AsRef<str>>(messages: &[S]) -> Result<RestoredFile> {
    let mut declared_hash: Option<String> = None;
    let mut fragments: Vec<(u32, String)> = Vec::new();

    for message in messages {
        match MessageRecord::parse(message.as_ref())? {
            MessageRecord::HashTag { hash } => match &declared_hash {
                None => declared_hash = Some(hash),
                Some(expected) if *expected == hash => {}
                Some(expected) => {
                    return Err(ComsaError::HashTagMismatch {
                        expected: expected.clone(),
                        found: hash,
                    });
                }
            },
            MessageRecord::DataFragment {
                sequence_index,
                payload,
            } => fragments.push((sequence_index, payload)),
        }
    }

    let declared_hash = declared_hash.ok_or(ComsaError::HashTagMissing {
        messages: messages.len(),
    })?;

    fragments.sort_by_key(|(sequence_index, _)| *sequence_index);

    let mut encoded = String::with_capacity(fragments.iter().map(|(_, p)| p.len()).sum());
    for (position, (sequence_index, payload)) in fragments.iter().enumerate() {
        if *sequence_index as usize != position {
            return Err(ComsaError::FragmentGap {
                position,
                found: *sequence_index,
            });
        }
        encoded.push_str(payload);
    }

    let decoded = decode_forgiving(&encoded).map_err(|error| {
        ComsaError::PayloadDecode(format!(
            "reassembled content of {} fragments is not valid base64: {}",
            fragments.len(),
            error
        ))
    })?;

    verify_hash(&decoded, &declared_hash)?;

    tracing::debug!(
        "reassembled {} fragments into {} bytes, sha256={}",
        fragments.len(),
        decoded.len(),
        declared_hash
    );

    Ok(RestoredFile {
        bytes: Bytes::from(decoded),
        file_hash: declared_hash.to_ascii_lowercase(),
        fragment_count: fragments.len(),
    })
}

/// Decode concatenated fragment text.
///
/// Characters outside the standard alphabet are skipped, and decoding ends at
/// the first padding that completes a quad; anything after it is ignored.
/// Fragments are cut from one padded encoding, so a padded quad in the middle
/// of the stream marks the end of the file. Running out of input inside a quad
/// that was never padded is an error.
fn decode_forgiving(encoded: &str) -> std::result::Result<Vec<u8>, String> {
    let mut cleaned = String::with_capacity(encoded.len());
    let mut quad_pos = 0usize;
    let mut pads = 0usize;
    let mut padded_end = false;

    for c in encoded.chars() {
        if c == '=' {
            if quad_pos >= 2 {
                pads += 1;
                if quad_pos + pads >= 4 {
                    padded_end = true;
                    break;
                }
            }
            continue;
        }
        if !(c.is_ascii_alphanumeric() || c == '+' || c == '/') {
            continue;
        }
        pads = 0;
        cleaned.push(c);
        quad_pos = (quad_pos + 1) % 4;
    }

    if !padded_end && quad_pos != 0 {
        return Err(format!(
            "{} data characters end inside an unpadded quad",
            cleaned.len()
        ));
    }

    FORGIVING
        .decode(cleaned.as_bytes())
        .map_err(|error| error.to_string())
}

/// Compute SHA256 hash of data
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Verify that data matches the declared hash
pub fn verify_hash(data: &[u8], expected_hash: &str) -> Result<()> {
    let actual_hash = compute_hash(data);
    if !actual_hash.eq_ignore_ascii_case(expected_hash.trim()) {
        return Err(ComsaError::ContentHashMismatch {
            expected: expected_hash.to_string(),
            actual: actual_hash,
        });
    }
    Ok(())
}

fn preview(message: &str) -> String {
    const LIMIT: usize = 32;
    match message.char_indices().nth(LIMIT) {
        Some((end, _)) => format!("'{}...'", &message[..end]),
        None => format!("'{}'", message),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::encode_messages;
    use super::*;

    const SAMPLE: &[u8] = b"a file that was split across several aggregate transactions";

    #[test]
    fn test_parse_fragment() {
        let record = MessageRecord::parse("00042#QUJD").unwrap();
        assert_eq!(
            record,
            MessageRecord::DataFragment {
                sequence_index: 42,
                payload: "QUJD".to_string()
            }
        );

        let empty = MessageRecord::parse("00000#").unwrap();
        assert_eq!(
            empty,
            MessageRecord::DataFragment {
                sequence_index: 0,
                payload: String::new()
            }
        );
    }

    #[test]
    fn test_parse_hash_tag() {
        let record = MessageRecord::parse(r#"{"version":"comsa-nft-1.0","hash":"abc"}"#).unwrap();
        assert_eq!(
            record,
            MessageRecord::HashTag {
                hash: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_other_messages() {
        for message in ["0001#abc", "0000a#abc", "hello", r#"{"name":"no hash"}"#, "00001"] {
            assert!(
                matches!(
                    MessageRecord::parse(message),
                    Err(ComsaError::PayloadDecode(_))
                ),
                "message {:?} should not parse",
                message
            );
        }
    }

    #[test]
    fn test_reassemble_round_trip() {
        let mut messages = encode_messages(SAMPLE, 7);
        messages.reverse();

        let restored = reassemble(&messages).unwrap();
        assert_eq!(restored.bytes.as_ref(), SAMPLE);
        assert_eq!(restored.file_hash, compute_hash(SAMPLE));
        assert_eq!(restored.fragment_count, messages.len() - 1);
    }

    #[test]
    fn test_reassemble_accepts_repeated_hash_tags() {
        let mut messages = encode_messages(SAMPLE, 16);
        let tag = messages.last().unwrap().clone();
        messages.insert(0, tag);

        assert_eq!(reassemble(&messages).unwrap().bytes.as_ref(), SAMPLE);
    }

    #[test]
    fn test_reassemble_detects_gap() {
        let mut messages = encode_messages(SAMPLE, 7);
        messages.remove(1);

        match reassemble(&messages) {
            Err(ComsaError::FragmentGap { position, found }) => {
                assert_eq!(position, 1);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_reassemble_detects_duplicate() {
        let mut messages = encode_messages(SAMPLE, 7);
        messages.insert(2, messages[1].clone());

        match reassemble(&messages) {
            Err(ComsaError::FragmentGap { position, found }) => {
                assert_eq!(position, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_reassemble_detects_corrupted_payload() {
        let mut messages = encode_messages(SAMPLE, 8);
        // "00000#" + payload; flip the first payload character to another base64 letter.
        let original = messages[0].clone();
        let first = original.as_bytes()[6];
        let replacement = if first == b'A' { 'B' } else { 'A' };
        messages[0] = format!("{}{}{}", &original[..6], replacement, &original[7..]);

        assert!(matches!(
            reassemble(&messages),
            Err(ComsaError::ContentHashMismatch { .. })
        ));
    }

    #[test]
    fn test_reassemble_hash_tag_mismatch() {
        let mut messages = encode_messages(SAMPLE, 8);
        messages.push(format!(r#"{{"hash":"{}"}}"#, compute_hash(b"other")));

        assert!(matches!(
            reassemble(&messages),
            Err(ComsaError::HashTagMismatch { .. })
        ));
    }

    #[test]
    fn test_reassemble_hash_tag_missing() {
        let mut messages = encode_messages(SAMPLE, 8);
        messages.pop();

        match reassemble(&messages) {
            Err(ComsaError::HashTagMissing { messages: count }) => {
                assert_eq!(count, messages.len())
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_reassemble_invalid_base64() {
        for payload in ["Q", "QUJDR", "QQ", "QUJDRA="] {
            let messages = vec![
                format!("00000#{}", payload),
                format!(r#"{{"hash":"{}"}}"#, compute_hash(b"")),
            ];

            assert!(
                matches!(reassemble(&messages), Err(ComsaError::PayloadDecode(_))),
                "payload {:?} should not decode",
                payload
            );
        }
    }

    #[test]
    fn test_reassemble_stops_at_first_padding() {
        // Everything after the first completed padding is dropped, so the
        // file is the single byte of the first fragment.
        let messages = vec![
            "00000#QQ==".to_string(),
            "00001#Qg==".to_string(),
            format!(r#"{{"hash":"{}"}}"#, compute_hash(b"A")),
        ];

        let restored = reassemble(&messages).unwrap();
        assert_eq!(restored.bytes.as_ref(), b"A");
        assert_eq!(restored.fragment_count, 2);

        let declared_ab = vec![
            "00000#QQ==".to_string(),
            "00001#Qg==".to_string(),
            format!(r#"{{"hash":"{}"}}"#, compute_hash(b"AB")),
        ];
        assert!(matches!(
            reassemble(&declared_ab),
            Err(ComsaError::ContentHashMismatch { .. })
        ));
    }

    #[test]
    fn test_reassemble_skips_characters_outside_alphabet() {
        let messages = vec![
            "00001#Y2hh\r\naW4=".to_string(),
            "00000#aGVs bG8g".to_string(),
            format!(r#"{{"hash":"{}"}}"#, compute_hash(b"hello chain")),
        ];

        assert_eq!(reassemble(&messages).unwrap().bytes.as_ref(), b"hello chain");
    }

    #[test]
    fn test_decode_forgiving() {
        assert_eq!(decode_forgiving("QQ==Qg==").unwrap(), b"A");
        assert_eq!(decode_forgiving("QUI=").unwrap(), b"AB");
        assert_eq!(decode_forgiving("Q=Q==").unwrap(), b"A");
        assert_eq!(decode_forgiving("").unwrap(), b"");
        assert_eq!(decode_forgiving("====").unwrap(), b"");
        assert!(decode_forgiving("QUJ").is_err());
    }

    #[test]
    fn test_reassemble_empty_file() {
        let messages = vec![format!(r#"{{"hash":"{}"}}"#, compute_hash(b""))];

        let restored = reassemble(&messages).unwrap();
        assert!(restored.bytes.is_empty());
        assert_eq!(restored.fragment_count, 0);
    }

    #[test]
    fn test_compute_hash() {
        let data = b"hello world";
        let hash = compute_hash(data);
        assert_eq!(hash.len(), 64); // SHA256 hex string is 64 chars
        assert!(verify_hash(data, &hash.to_uppercase()).is_ok());
    }
}
