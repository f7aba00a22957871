use std::future::Future;

use evidence_ledger::database::Database;
use evidence_ledger::encoding::{sha256, to_base64};
use evidence_ledger::error::EvidenceError;
use evidence_ledger::ledger::client::DigestProvider;
use evidence_ledger::ledger::digest::DigestProof;
use evidence_ledger::ledger::event::{BlockAddress, LedgerHash};
use serde_json::{json, Value};

/// Setup an in-memory SQLite database for testing
pub async fn setup_test_db() -> Database {
    Database::new_in_memory()
        .await
        .expect("Failed to create test database")
}

/// Deterministic 32-byte ledger hash for a label
pub fn test_hash(label: &str) -> LedgerHash {
    LedgerHash(sha256(label.as_bytes()))
}

/// Build a raw revision-details stream entry
pub fn revision_entry(id: &str, version: u64, sequence_no: u64, hash: &LedgerHash) -> Value {
    json!({
        "kind": "revision-details",
        "streamSourceId": "stream-1",
        "tableName": "evidence",
        "tableId": "tbl-evidence",
        "blockAddress": {"strandId": "S1", "sequenceNo": sequence_no},
        "hash": to_base64(hash.as_bytes()),
        "payload": {
            "providerId": "prov-1",
            "schemaId": "schema-1",
            "objectUrl": format!("https://evidence-payloads.store.example/{}/v{}.json", id, version)
        },
        "revisionMetadata": {
            "id": id,
            "version": version,
            "txTime": "2026-08-24T10:00:00Z",
            "txId": format!("tx-{}-{}", id, version)
        }
    })
}

/// Digest provider that always returns the same proof
pub struct StaticDigestProvider {
    pub proof: DigestProof,
}

impl DigestProvider for StaticDigestProvider {
    fn get_digest_proof(
        &self,
        _table_id: &str,
        _block_address: &BlockAddress,
    ) -> impl Future<Output = Result<DigestProof, EvidenceError>> + Send {
        let proof = self.proof.clone();
        async move { Ok(proof) }
    }
}

/// Digest provider that simulates an unreachable digest endpoint
pub struct FailingDigestProvider;

impl DigestProvider for FailingDigestProvider {
    fn get_digest_proof(
        &self,
        _table_id: &str,
        _block_address: &BlockAddress,
    ) -> impl Future<Output = Result<DigestProof, EvidenceError>> + Send {
        async move {
            Err(EvidenceError::Transient(
                "digest endpoint unavailable".to_string(),
            ))
        }
    }
}
