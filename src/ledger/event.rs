//! Revision Event Model
//!
//! Canonical shape of a single change-stream record: ledger table
//! identity, block address, claimed hash, opaque payload, and revision
//! metadata. Events are immutable once decoded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::encoding;
use crate::error::EvidenceError;
use crate::objectstore::ObjectLocator;

/// Record kind tag carried by every change-stream entry. Only
/// revision-details entries reach the verification pipeline.
pub const REVISION_DETAILS_KIND: &str = "revision-details";

/// A 256-bit ledger hash, validated at the decode boundary. Carried as
/// standard base64 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerHash(pub [u8; 32]);

impl LedgerHash {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EvidenceError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            EvidenceError::MalformedProof(format!(
                "hash must be exactly 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, EvidenceError> {
        let bytes = encoding::from_base64(encoded)
            .map_err(|e| EvidenceError::MalformedProof(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_base64(&self) -> String {
        encoding::to_base64(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Location of the committing block inside the ledger's hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAddress {
    pub strand_id: String,
    pub sequence_no: u64,
}

/// Per-revision metadata. `version` is strictly monotonic per `id`; the
/// store's version gate relies on it to reject duplicate and out-of-order
/// deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionMetadata {
    pub id: String,
    pub version: u64,
    pub tx_time: DateTime<Utc>,
    pub tx_id: String,
}

/// One decoded revision-details change-stream record.
#[derive(Debug, Clone)]
pub struct RevisionEvent {
    pub stream_source_id: String,
    pub table_name: String,
    pub table_id: String,
    pub block_address: BlockAddress,
    pub claimed_hash: LedgerHash,
    /// Evidence content, passed through untouched apart from the handful
    /// of attribute fields extracted below.
    pub payload: serde_json::Value,
    pub metadata: RevisionMetadata,
}

/// The attribute fields the metadata store keeps from an otherwise opaque
/// payload: provider, schema, and the off-ledger object locator.
#[derive(Debug, Clone, Default)]
pub struct EvidenceAttributes {
    pub provider_id: Option<String>,
    pub schema_id: Option<String>,
    pub object_locator: Option<ObjectLocator>,
}

impl EvidenceAttributes {
    /// Extract known attributes from a payload. A present-but-invalid
    /// object URL fails the whole record; a poisoned locator would break
    /// every later signed-URL mint for this evidence.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, EvidenceError> {
        let field = |name: &str| {
            payload
                .get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        let object_locator = match payload.get("objectUrl").and_then(|v| v.as_str()) {
            Some(url) => Some(
                ObjectLocator::parse(url)
                    .map_err(|e| EvidenceError::MalformedRecord(e.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            provider_id: field("providerId"),
            schema_id: field("schemaId"),
            object_locator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ledger_hash_length_validation() {
        assert!(LedgerHash::from_bytes(&[0u8; 32]).is_ok());
        assert!(matches!(
            LedgerHash::from_bytes(&[0u8; 31]),
            Err(EvidenceError::MalformedProof(_))
        ));
        assert!(matches!(
            LedgerHash::from_base64("aGVsbG8="),
            Err(EvidenceError::MalformedProof(_))
        ));
    }

    #[test]
    fn test_ledger_hash_base64_round_trip() {
        let hash = LedgerHash(crate::encoding::sha256(b"revision"));
        let decoded = LedgerHash::from_base64(&hash.to_base64()).unwrap();
        assert_eq!(decoded, hash);
    }

    #[test]
    fn test_attributes_from_payload() {
        let payload = json!({
            "providerId": "prov-1",
            "schemaId": "schema-7",
            "objectUrl": "https://bucket-a.store.example/evidence/e1.pdf",
            "freeform": {"anything": true}
        });
        let attrs = EvidenceAttributes::from_payload(&payload).unwrap();
        assert_eq!(attrs.provider_id.as_deref(), Some("prov-1"));
        assert_eq!(attrs.schema_id.as_deref(), Some("schema-7"));
        let locator = attrs.object_locator.unwrap();
        assert_eq!(locator.bucket, "bucket-a");
        assert_eq!(locator.key, "evidence/e1.pdf");
    }

    #[test]
    fn test_attributes_bad_object_url_fails_record() {
        let payload = json!({"objectUrl": "not-a-url"});
        assert!(matches!(
            EvidenceAttributes::from_payload(&payload),
            Err(EvidenceError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_attributes_absent_fields_default() {
        let attrs = EvidenceAttributes::from_payload(&json!({"blob": [1, 2, 3]})).unwrap();
        assert!(attrs.provider_id.is_none());
        assert!(attrs.schema_id.is_none());
        assert!(attrs.object_locator.is_none());
    }
}
