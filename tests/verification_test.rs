//! On-demand verification tests: digest match and mismatch outcomes,
//! unknown ids, transient digest failures, and the version gate on
//! recording outcomes.

use std::future::Future;
use std::sync::Mutex;

use chrono::Utc;
use evidence_ledger::database::models::VerificationStatus;
use evidence_ledger::database::Database;
use evidence_ledger::error::EvidenceError;
use evidence_ledger::ledger::client::DigestProvider;
use evidence_ledger::ledger::digest::{combine, DigestProof};
use evidence_ledger::ledger::event::BlockAddress;
use evidence_ledger::ledger::parser::parse_batch;
use evidence_ledger::service::VerificationService;
use serde_json::Value;

mod common;
use common::*;

/// Digest provider that ingests a queued revision into the store during
/// each fetch, so the verifying caller's version goes stale between
/// recompute and write.
struct AdvancingDigestProvider {
    db: Database,
    proof: DigestProof,
    injections: Mutex<Vec<Value>>,
}

impl DigestProvider for AdvancingDigestProvider {
    fn get_digest_proof(
        &self,
        _table_id: &str,
        _block_address: &BlockAddress,
    ) -> impl Future<Output = Result<DigestProof, EvidenceError>> + Send {
        let injection = self.injections.lock().unwrap().pop();
        let db = self.db.clone();
        let proof = self.proof.clone();
        async move {
            if let Some(entry) = injection {
                let event = parse_batch(vec![entry]).next().unwrap().unwrap();
                db.upsert_from_revision(&event).await.unwrap();
            }
            Ok(proof)
        }
    }
}

#[tokio::test]
async fn test_verify_with_empty_proof_path() {
    let db = setup_test_db().await;
    let h1 = test_hash("E1-v1");

    // Digest endpoint reports the revision hash itself as the digest.
    let service = VerificationService::new(
        db.clone(),
        StaticDigestProvider {
            proof: DigestProof {
                target_hash: h1,
                proof_path: vec![],
            },
        },
    );

    let summary = service.ingest(vec![revision_entry("E1", 1, 10, &h1)]).await;
    assert_eq!(summary.accepted, 1);

    let result = service.verify("E1").await.unwrap();
    assert_eq!(result.verification_status, VerificationStatus::Verified);
    assert!(result.last_verified_at.is_some());

    let record = db.get_by_id("E1").await.unwrap().unwrap();
    assert_eq!(record.verification_status, VerificationStatus::Verified);
}

#[tokio::test]
async fn test_verify_with_proof_path() {
    let db = setup_test_db().await;
    let h1 = test_hash("E1-v1");

    // Forward-build the digest from the revision hash through siblings.
    let siblings = vec![test_hash("sib-0"), test_hash("sib-1"), test_hash("sib-2")];
    let mut digest = h1;
    for sibling in &siblings {
        digest = combine(&digest, sibling);
    }

    let service = VerificationService::new(
        db,
        StaticDigestProvider {
            proof: DigestProof {
                target_hash: digest,
                proof_path: siblings,
            },
        },
    );

    service.ingest(vec![revision_entry("E1", 1, 10, &h1)]).await;
    let result = service.verify("E1").await.unwrap();
    assert_eq!(result.verification_status, VerificationStatus::Verified);
}

#[tokio::test]
async fn test_verify_mismatch_records_failed() {
    let db = setup_test_db().await;
    let h1 = test_hash("E1-v1");

    let service = VerificationService::new(
        db.clone(),
        StaticDigestProvider {
            proof: DigestProof {
                target_hash: test_hash("some-other-digest"),
                proof_path: vec![],
            },
        },
    );

    service.ingest(vec![revision_entry("E1", 1, 10, &h1)]).await;
    let result = service.verify("E1").await.unwrap();

    // Mismatch is a recorded outcome, not an error.
    assert_eq!(result.verification_status, VerificationStatus::Failed);
    assert!(result.last_verified_at.is_some());

    let record = db.get_by_id("E1").await.unwrap().unwrap();
    assert_eq!(record.verification_status, VerificationStatus::Failed);
    assert!(record.last_verified_at.is_some());
}

#[tokio::test]
async fn test_reverification_can_flip_status() {
    let db = setup_test_db().await;
    let h1 = test_hash("E1-v1");

    let failing = VerificationService::new(
        db.clone(),
        StaticDigestProvider {
            proof: DigestProof {
                target_hash: test_hash("rotated-digest"),
                proof_path: vec![],
            },
        },
    );
    failing.ingest(vec![revision_entry("E1", 1, 10, &h1)]).await;
    let first = failing.verify("E1").await.unwrap();
    assert_eq!(first.verification_status, VerificationStatus::Failed);

    // A later digest snapshot matches again; Failed is not terminal.
    let passing = VerificationService::new(
        db,
        StaticDigestProvider {
            proof: DigestProof {
                target_hash: h1,
                proof_path: vec![],
            },
        },
    );
    let second = passing.verify("E1").await.unwrap();
    assert_eq!(second.verification_status, VerificationStatus::Verified);
}

#[tokio::test]
async fn test_verify_unknown_id() {
    let db = setup_test_db().await;
    let service = VerificationService::new(
        db,
        StaticDigestProvider {
            proof: DigestProof {
                target_hash: test_hash("whatever"),
                proof_path: vec![],
            },
        },
    );

    assert!(matches!(
        service.verify("missing").await,
        Err(EvidenceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_digest_endpoint_failure_leaves_no_state() {
    let db = setup_test_db().await;
    let h1 = test_hash("E1-v1");
    let service = VerificationService::new(db.clone(), FailingDigestProvider);

    service.ingest(vec![revision_entry("E1", 1, 10, &h1)]).await;
    assert!(matches!(
        service.verify("E1").await,
        Err(EvidenceError::Transient(_))
    ));

    // No partial write: status and timestamp are untouched.
    let record = db.get_by_id("E1").await.unwrap().unwrap();
    assert_eq!(record.verification_status, VerificationStatus::Unverified);
    assert!(record.last_verified_at.is_none());
}

#[tokio::test]
async fn test_verify_retries_once_after_losing_version_race() {
    let db = setup_test_db().await;
    let h2 = test_hash("E1-v2");

    // Version 2 lands while the first digest fetch is in flight, so the
    // first recording write conflicts; the internal retry refetches the
    // record and recomputes against the new revision.
    let provider = AdvancingDigestProvider {
        db: db.clone(),
        proof: DigestProof {
            target_hash: h2,
            proof_path: vec![],
        },
        injections: Mutex::new(vec![revision_entry("E1", 2, 20, &h2)]),
    };
    let service = VerificationService::new(db.clone(), provider);

    service
        .ingest(vec![revision_entry("E1", 1, 10, &test_hash("E1-v1"))])
        .await;

    let result = service.verify("E1").await.unwrap();
    assert_eq!(result.verification_status, VerificationStatus::Verified);

    let record = db.get_by_id("E1").await.unwrap().unwrap();
    assert_eq!(record.latest_version, 2);
    assert_eq!(record.verification_status, VerificationStatus::Verified);
}

#[tokio::test]
async fn test_verify_surfaces_transient_after_second_conflict() {
    let db = setup_test_db().await;
    let h1 = test_hash("E1-v1");

    // A new revision lands during every digest fetch, so both the first
    // attempt and the single retry lose the version race.
    let provider = AdvancingDigestProvider {
        db: db.clone(),
        proof: DigestProof {
            target_hash: h1,
            proof_path: vec![],
        },
        injections: Mutex::new(vec![
            revision_entry("E1", 3, 30, &test_hash("E1-v3")),
            revision_entry("E1", 2, 20, &test_hash("E1-v2")),
        ]),
    };
    let service = VerificationService::new(db.clone(), provider);

    service.ingest(vec![revision_entry("E1", 1, 10, &h1)]).await;

    assert!(matches!(
        service.verify("E1").await,
        Err(EvidenceError::Transient(_))
    ));

    // No outcome was ever recorded; only the ingested versions advanced.
    let record = db.get_by_id("E1").await.unwrap().unwrap();
    assert_eq!(record.latest_version, 3);
    assert_eq!(record.verification_status, VerificationStatus::Unverified);
    assert!(record.last_verified_at.is_none());
}

#[tokio::test]
async fn test_record_verification_version_gate() {
    let db = setup_test_db().await;
    let h1 = test_hash("E1-v1");
    let service = VerificationService::new(
        db.clone(),
        StaticDigestProvider {
            proof: DigestProof {
                target_hash: h1,
                proof_path: vec![],
            },
        },
    );
    service.ingest(vec![revision_entry("E1", 1, 10, &h1)]).await;

    // A write against a version that is no longer current must conflict.
    let stale = db
        .record_verification("E1", 99, VerificationStatus::Verified, Utc::now())
        .await;
    assert!(matches!(stale, Err(EvidenceError::ConcurrentUpdate(_))));

    // And against an unknown id it is NotFound, not a conflict.
    let missing = db
        .record_verification("nope", 1, VerificationStatus::Verified, Utc::now())
        .await;
    assert!(matches!(missing, Err(EvidenceError::NotFound(_))));

    // A version outside the storable integer range is an input error.
    let out_of_range = db
        .record_verification("E1", u64::MAX, VerificationStatus::Verified, Utc::now())
        .await;
    assert!(matches!(out_of_range, Err(EvidenceError::MalformedRecord(_))));

    // The current version still goes through.
    let ok = db
        .record_verification("E1", 1, VerificationStatus::Verified, Utc::now())
        .await
        .unwrap();
    assert_eq!(ok.verification_status, VerificationStatus::Verified);
}

#[tokio::test]
async fn test_verify_targets_latest_version_and_is_idempotent() {
    let db = setup_test_db().await;
    let h2 = test_hash("E1-v2");

    // The digest endpoint matches the version-2 hash; verification runs
    // against the latest stored revision, not the first one ingested.
    let service = VerificationService::new(
        db.clone(),
        StaticDigestProvider {
            proof: DigestProof {
                target_hash: h2,
                proof_path: vec![],
            },
        },
    );

    service
        .ingest(vec![
            revision_entry("E1", 1, 10, &test_hash("E1-v1")),
            revision_entry("E1", 2, 20, &h2),
        ])
        .await;

    let result = service.verify("E1").await.unwrap();
    assert_eq!(result.verification_status, VerificationStatus::Verified);

    // Verifying the same revision twice yields the same status.
    let again = service.verify("E1").await.unwrap();
    assert_eq!(again.verification_status, VerificationStatus::Verified);
}
