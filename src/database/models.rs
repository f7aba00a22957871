use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EvidenceError;
use crate::objectstore::ObjectLocator;

/// Verification lifecycle of an evidence record. Starts at `Unverified`
/// on first ingestion; `verify` moves it to `Verified` or `Failed`, and
/// re-verification may flip either way. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Unverified,
    Verified,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "Unverified",
            Self::Verified => "Verified",
            Self::Failed => "Failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, EvidenceError> {
        match s {
            "Unverified" => Ok(Self::Unverified),
            "Verified" => Ok(Self::Verified),
            "Failed" => Ok(Self::Failed),
            other => Err(EvidenceError::DatabaseError(format!(
                "unknown verification status: {}",
                other
            ))),
        }
    }
}

/// Persisted state for one evidence id: the latest revision's identity
/// inside the ledger, the attributes extracted from its payload, and the
/// verification outcome. Mutated only through the store's version gate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceRecord {
    pub evidence_id: String,
    pub provider_id: Option<String>,
    pub schema_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_locator: Option<ObjectLocator>,
    pub table_id: String,
    pub table_name: String,
    pub strand_id: String,
    pub sequence_no: u64,
    pub claimed_hash: String,
    pub latest_version: u64,
    pub verification_status: VerificationStatus,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub tx_id: String,
    pub tx_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of an ingestion upsert, reported so batch ingestion can tally
/// accepted versus duplicate deliveries.
#[derive(Debug, Clone)]
pub enum UpsertOutcome {
    /// First revision seen for this id.
    Created(EvidenceRecord),
    /// Newer revision applied over an older stored version.
    Updated(EvidenceRecord),
    /// Stored version is equal or newer; nothing written.
    Stale(EvidenceRecord),
}

impl UpsertOutcome {
    pub fn record(&self) -> &EvidenceRecord {
        match self {
            Self::Created(r) | Self::Updated(r) | Self::Stale(r) => r,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}
