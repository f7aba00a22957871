//! Hash-Chain / Digest Verifier
//!
//! Recomputes a ledger-wide digest from a revision's claimed hash and an
//! ordered proof path of sibling hashes, then compares it byte-exact to a
//! trusted digest snapshot.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::EvidenceError;
use crate::ledger::event::LedgerHash;

/// Digest snapshot plus the sibling path connecting one revision to it.
#[derive(Debug, Clone)]
pub struct DigestProof {
    /// Trusted ledger-wide digest at a point in time (the root).
    pub target_hash: LedgerHash,
    /// Sibling hashes ordered leaf to root. Empty means the claimed hash
    /// must equal the target directly.
    pub proof_path: Vec<LedgerHash>,
}

impl DigestProof {
    /// Decode a proof from base64 wire form, validating every hash length.
    pub fn from_base64(target: &str, path: &[String]) -> Result<Self, EvidenceError> {
        Ok(Self {
            target_hash: LedgerHash::from_base64(target)?,
            proof_path: path
                .iter()
                .map(|h| LedgerHash::from_base64(h))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

/// Terminal result of a digest comparison. `Failed` is an expected,
/// recordable outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Failed,
}

/// Combine two node hashes into their parent. The smaller hash (byte
/// lexicographic) always goes first; this is a fixed convention of the
/// proof format, shared with the proof producer, never inferred at
/// runtime.
pub fn combine(a: &LedgerHash, b: &LedgerHash) -> LedgerHash {
    let (lo, hi) = if a.as_bytes() <= b.as_bytes() {
        (a, b)
    } else {
        (b, a)
    };
    let mut hasher = Sha256::new();
    hasher.update(lo.as_bytes());
    hasher.update(hi.as_bytes());
    LedgerHash(hasher.finalize().into())
}

/// Fold the proof path from the claimed hash up to a candidate root.
pub fn recompute_digest(claimed: &LedgerHash, proof_path: &[LedgerHash]) -> LedgerHash {
    let mut current = *claimed;
    for sibling in proof_path {
        current = combine(&current, sibling);
    }
    current
}

/// Decide whether `claimed` combined with the proof path reproduces the
/// proof's target digest.
pub fn verify_digest(claimed: &LedgerHash, proof: &DigestProof) -> VerificationOutcome {
    let recomputed = recompute_digest(claimed, &proof.proof_path);
    if recomputed == proof.target_hash {
        debug!("Digest recomputation matched target");
        VerificationOutcome::Verified
    } else {
        debug!(
            "Digest mismatch: recomputed {} != target {}",
            recomputed.to_base64(),
            proof.target_hash.to_base64()
        );
        VerificationOutcome::Failed
    }
}
