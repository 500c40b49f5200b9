//! Ledger encoding.
//!
//! The ledger object's entire content is the JSON encoding of its
//! [`LedgerEntries`] map. The object's own hold flag is operational state
//! and never part of the content.

use bytes::Bytes;
use lockledger_types::LedgerEntries;

/// Errors from encoding or decoding a ledger.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("decoding failed: {0}")]
    Decode(String),

    #[error("entry stored under {key:?} is named {name:?}")]
    KeyMismatch { key: String, name: String },
}

/// Codec for the ledger object's content.
pub struct LedgerCodec;

impl LedgerCodec {
    /// Encode entries. Output is deterministic for equal maps.
    pub fn encode(entries: &LedgerEntries) -> Result<Bytes, CodecError> {
        serde_json::to_vec(entries)
            .map(Bytes::from)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decode entries. Empty content decodes to an empty ledger.
    pub fn decode(data: &[u8]) -> Result<LedgerEntries, CodecError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(LedgerEntries::new());
        }
        let entries: LedgerEntries =
            serde_json::from_slice(data).map_err(|e| CodecError::Decode(e.to_string()))?;
        if let Some((key, entry)) = entries.iter().find(|(key, entry)| **key != entry.name) {
            return Err(CodecError::KeyMismatch {
                key: key.clone(),
                name: entry.name.clone(),
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use lockledger_types::{Generation, LockEntry, ObjectVersion};
    use proptest::collection::{btree_map, vec};
    use proptest::option;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
        // Whole seconds between 2000 and 2100.
        (946_684_800i64..4_102_444_800i64)
            .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap())
    }

    fn arb_entry(name: String) -> impl Strategy<Value = LockEntry> {
        (
            any::<bool>(),
            option::of(arb_timestamp()),
            btree_map("[a-z_]{1,8}", ".{0,12}", 0..4),
            option::of(arb_timestamp()),
            option::of((any::<u64>(), 1u64..1_000)),
        )
            .prop_map(move |(hold, expiry, metadata, updated, version)| LockEntry {
                name: name.clone(),
                temporary_hold: hold,
                expiration_date: expiry,
                metadata,
                updated_at: updated,
                version: version
                    .map(|(g, m)| ObjectVersion::new(Generation::new(g), m)),
            })
    }

    fn arb_entries() -> impl Strategy<Value = LedgerEntries> {
        vec("[a-zA-Z0-9/._ -]{1,24}", 0..12).prop_flat_map(|names| {
            let entries: Vec<_> = names.into_iter().map(arb_entry).collect();
            entries.prop_map(|entries| {
                entries
                    .into_iter()
                    .map(|entry| (entry.name.clone(), entry))
                    .collect::<BTreeMap<_, _>>()
            })
        })
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(entries in arb_entries()) {
            let encoded = LedgerCodec::encode(&entries).unwrap();
            let decoded = LedgerCodec::decode(&encoded).unwrap();
            prop_assert_eq!(decoded, entries);
        }
    }

    #[test]
    fn empty_content_is_empty_ledger() {
        assert!(LedgerCodec::decode(b"").unwrap().is_empty());
        assert!(LedgerCodec::decode(b"{}").unwrap().is_empty());
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut a = LedgerEntries::new();
        let mut b = LedgerEntries::new();
        for name in ["z.txt", "a.txt", "m.txt"] {
            let entry = LockEntry {
                name: name.into(),
                temporary_hold: true,
                expiration_date: None,
                metadata: BTreeMap::new(),
                updated_at: None,
                version: None,
            };
            a.insert(name.into(), entry.clone());
        }
        for name in ["m.txt", "z.txt", "a.txt"] {
            b.insert(name.into(), a[name].clone());
        }
        assert_eq!(
            LedgerCodec::encode(&a).unwrap(),
            LedgerCodec::encode(&b).unwrap()
        );
    }

    #[test]
    fn garbage_is_rejected() {
        let err = LedgerCodec::decode(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn key_must_match_entry_name() {
        let data = br#"{"a.txt": {"name": "b.txt", "temporary_hold": true}}"#;
        let err = LedgerCodec::decode(data).unwrap_err();
        assert!(matches!(err, CodecError::KeyMismatch { .. }));
    }
}
