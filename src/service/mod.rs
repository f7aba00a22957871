//! Verification Service
//!
//! Orchestrates the two operations exposed to collaborators: batch
//! ingestion of change-stream records, and on-demand verification of a
//! single evidence id against a fresh ledger digest.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::database::models::VerificationStatus;
use crate::database::Database;
use crate::error::EvidenceError;
use crate::ledger::client::DigestProvider;
use crate::ledger::digest::{verify_digest, VerificationOutcome};
use crate::ledger::event::{BlockAddress, LedgerHash};
use crate::ledger::parser::parse_batch;

/// Per-batch ingestion tally. `failed` counts malformed records and
/// per-event store errors; a whole batch of failures usually means an
/// upstream schema change rather than bad individual records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub accepted: u64,
    pub duplicate: u64,
    pub failed: u64,
}

/// Outcome of a `verify` call: the recorded status plus when it was
/// recorded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verification_status: VerificationStatus,
    pub last_verified_at: Option<DateTime<Utc>>,
}

pub struct VerificationService<P: DigestProvider> {
    database: Database,
    digest_provider: P,
}

impl<P: DigestProvider> VerificationService<P> {
    pub fn new(database: Database, digest_provider: P) -> Self {
        Self {
            database,
            digest_provider,
        }
    }

    /// Ingest one raw change-stream batch. Per-event failures are
    /// isolated: a malformed record or a store error on one event never
    /// aborts the rest of the batch. No digest verification happens here;
    /// ingestion only records that a revision exists.
    pub async fn ingest(&self, batch: Vec<serde_json::Value>) -> IngestSummary {
        let mut summary = IngestSummary::default();

        for parsed in parse_batch(batch) {
            let event = match parsed {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping malformed stream record: {}", e);
                    summary.failed += 1;
                    continue;
                }
            };

            match self.database.upsert_from_revision(&event).await {
                Ok(outcome) if outcome.is_stale() => summary.duplicate += 1,
                Ok(outcome) => {
                    debug!(
                        "Evidence {} recorded at version {}",
                        outcome.record().evidence_id,
                        outcome.record().latest_version
                    );
                    summary.accepted += 1;
                }
                Err(e) => {
                    warn!("Store rejected revision {}: {}", event.metadata.id, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Ingested batch: {} accepted, {} duplicate, {} failed",
            summary.accepted, summary.duplicate, summary.failed
        );
        summary
    }

    /// Verify the latest known revision of an evidence id against a fresh
    /// ledger digest and record the outcome. A digest mismatch is the
    /// `Failed` status, not an error. A lost version race is retried once
    /// by refetching and recomputing; a second conflict surfaces as
    /// transient so the caller can retry.
    pub async fn verify(&self, evidence_id: &str) -> Result<VerificationResult, EvidenceError> {
        match self.verify_once(evidence_id).await {
            Err(EvidenceError::ConcurrentUpdate(reason)) => {
                debug!(
                    "Verification of {} lost a version race ({}), retrying once",
                    evidence_id, reason
                );
                self.verify_once(evidence_id).await.map_err(|e| match e {
                    EvidenceError::ConcurrentUpdate(reason) => EvidenceError::Transient(format!(
                        "verification of {} keeps conflicting: {}",
                        evidence_id, reason
                    )),
                    other => other,
                })
            }
            other => other,
        }
    }

    async fn verify_once(&self, evidence_id: &str) -> Result<VerificationResult, EvidenceError> {
        let record = self
            .database
            .get_by_id(evidence_id)
            .await?
            .ok_or_else(|| EvidenceError::NotFound(evidence_id.to_string()))?;

        let claimed = LedgerHash::from_base64(&record.claimed_hash)?;
        let block_address = BlockAddress {
            strand_id: record.strand_id.clone(),
            sequence_no: record.sequence_no,
        };

        // Fetch and recompute before touching the store, so a timeout or
        // endpoint failure leaves no partial state behind.
        let proof = self
            .digest_provider
            .get_digest_proof(&record.table_id, &block_address)
            .await?;

        let status = match verify_digest(&claimed, &proof) {
            VerificationOutcome::Verified => VerificationStatus::Verified,
            VerificationOutcome::Failed => VerificationStatus::Failed,
        };

        let verified_at = Utc::now();
        let updated = self
            .database
            .record_verification(evidence_id, record.latest_version, status, verified_at)
            .await?;

        info!(
            "Verification of {} (version {}) recorded as {}",
            evidence_id,
            record.latest_version,
            status.as_str()
        );

        Ok(VerificationResult {
            verification_status: updated.verification_status,
            last_verified_at: updated.last_verified_at,
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}
