//! Evidence Metadata Store
//!
//! SQLite-backed persistence for evidence records. Every mutation goes
//! through a single-row compare-and-set on `latest_version`; the store
//! never deletes records (retention is an external concern).

pub mod models;
pub mod queries;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::database::models::{EvidenceRecord, UpsertOutcome, VerificationStatus};
use crate::database::queries::EvidenceQueries;
use crate::error::EvidenceError;
use crate::ledger::event::RevisionEvent;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Ok(Database { pool })
    }

    /// In-memory database for tests. A single connection keeps every
    /// statement on the same in-memory instance.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Database { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(include_str!("../migrations/001_evidence_records.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_by_id(
        &self,
        evidence_id: &str,
    ) -> Result<Option<EvidenceRecord>, EvidenceError> {
        EvidenceQueries::get_by_id(&self.pool, evidence_id).await
    }

    pub async fn upsert_from_revision(
        &self,
        event: &RevisionEvent,
    ) -> Result<UpsertOutcome, EvidenceError> {
        EvidenceQueries::upsert_from_revision(&self.pool, event).await
    }

    pub async fn record_verification(
        &self,
        evidence_id: &str,
        version: u64,
        status: VerificationStatus,
        verified_at: DateTime<Utc>,
    ) -> Result<EvidenceRecord, EvidenceError> {
        EvidenceQueries::record_verification(&self.pool, evidence_id, version, status, verified_at)
            .await
    }
}
