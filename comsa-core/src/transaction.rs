//! Message extraction from confirmed aggregate transactions.

use crate::error::{ComsaError, Result};
use serde_json::Value;

/// Length of the message type prefix that precedes the text payload.
pub const MESSAGE_TYPE_PREFIX_LEN: usize = 1;

/// Pull every embedded message out of an aggregate transaction record.
///
/// Inner transactions live at `transaction.transactions[*].transaction`; each
/// `message` field is hex, starting with one type byte that is discarded.
/// Inner transactions without a message are skipped.
pub fn extract_messages(reference: &str, record: &Value) -> Result<Vec<String>> {
    let inner = record
        .pointer("/transaction/transactions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ComsaError::PayloadDecode(format!(
                "transaction {} has no inner transactions",
                reference
            ))
        })?;

    let mut messages = Vec::with_capacity(inner.len());
    for (position, entry) in inner.iter().enumerate() {
        let Some(message) = entry.pointer("/transaction/message") else {
            tracing::warn!(
                "inner transaction without message skipped. reference={} position={}",
                reference,
                position
            );
            continue;
        };

        let hex_payload = message.as_str().ok_or_else(|| {
            ComsaError::PayloadDecode(format!(
                "message of transaction {} at position {} is not a string",
                reference, position
            ))
        })?;

        messages.push(decode_message(hex_payload).map_err(|error| {
            ComsaError::PayloadDecode(format!(
                "message of transaction {} at position {}: {}",
                reference, position, error
            ))
        })?);
    }

    Ok(messages)
}

/// Decode one hex message payload, dropping the type prefix.
pub fn decode_message(hex_payload: &str) -> std::result::Result<String, String> {
    let raw = hex::decode(hex_payload.trim()).map_err(|error| format!("not hex: {}", error))?;
    if raw.len() < MESSAGE_TYPE_PREFIX_LEN {
        return Err("missing message type byte".to_string());
    }

    String::from_utf8(raw[MESSAGE_TYPE_PREFIX_LEN..].to_vec())
        .map_err(|error| format!("not UTF-8: {}", error))
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::{Value, json};

    /// Wrap plain text messages into the node's aggregate transaction shape.
    pub fn aggregate_record(messages: &[&str]) -> Value {
        let inner: Vec<Value> = messages
            .iter()
            .map(|message| {
                let mut raw = vec![0u8];
                raw.extend_from_slice(message.as_bytes());
                json!({ "transaction": { "type": 16724, "message": hex::encode_upper(raw) } })
            })
            .collect();

        json!({
            "meta": { "height": "1" },
            "transaction": { "type": 16705, "transactions": inner }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::aggregate_record;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_messages() {
        let record = aggregate_record(&["00000#QQ==", r#"{"hash":"ab"}"#]);
        let messages = extract_messages("txA", &record).unwrap();
        assert_eq!(messages, vec!["00000#QQ==", r#"{"hash":"ab"}"#]);
    }

    #[test]
    fn test_extract_skips_inner_without_message() {
        let record = json!({
            "transaction": {
                "transactions": [
                    { "transaction": { "type": 16718 } },
                    { "transaction": { "message": "0030303030312341" } }
                ]
            }
        });

        let messages = extract_messages("txB", &record).unwrap();
        assert_eq!(messages, vec!["00001#A"]);
    }

    #[test]
    fn test_extract_requires_inner_transactions() {
        let record = json!({ "transaction": { "message": "00" } });
        assert!(matches!(
            extract_messages("txC", &record),
            Err(ComsaError::PayloadDecode(_))
        ));
    }

    #[test]
    fn test_extract_rejects_bad_message() {
        for message in [json!("zz"), json!(""), json!("00FF"), json!(12)] {
            let record = json!({
                "transaction": { "transactions": [ { "transaction": { "message": message } } ] }
            });
            assert!(matches!(
                extract_messages("txD", &record),
                Err(ComsaError::PayloadDecode(_))
            ));
        }
    }

    #[test]
    fn test_decode_message_drops_type_byte() {
        assert_eq!(decode_message("0148656C6C6F").unwrap(), "Hello");
        assert_eq!(decode_message("00").unwrap(), "");
    }
}
