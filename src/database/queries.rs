use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::database::models::{EvidenceRecord, UpsertOutcome, VerificationStatus};
use crate::error::EvidenceError;
use crate::ledger::event::{EvidenceAttributes, RevisionEvent};
use crate::objectstore::ObjectLocator;

const SELECT_COLUMNS: &str = "evidence_id, provider_id, schema_id, object_bucket, object_key, \
     table_id, table_name, strand_id, sequence_no, claimed_hash, latest_version, \
     verification_status, last_verified_at, tx_id, tx_time, created_at, updated_at";

pub struct EvidenceQueries;

impl EvidenceQueries {
    pub async fn get_by_id(
        pool: &SqlitePool,
        evidence_id: &str,
    ) -> Result<Option<EvidenceRecord>, EvidenceError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM evidence_records WHERE evidence_id = ?",
            SELECT_COLUMNS
        ))
        .bind(evidence_id)
        .fetch_optional(pool)
        .await?;

        row.map(map_row).transpose()
    }

    /// Create-or-advance an evidence record from a revision event. The
    /// version gate is a single-row compare-and-set: concurrent ingests of
    /// the same id cannot move the stored version backwards, and redelivery
    /// of an already-recorded version is a no-op.
    pub async fn upsert_from_revision(
        pool: &SqlitePool,
        event: &RevisionEvent,
    ) -> Result<UpsertOutcome, EvidenceError> {
        let attrs = EvidenceAttributes::from_payload(&event.payload)?;
        let version = as_db_int(event.metadata.version, "version")?;
        let sequence_no = as_db_int(event.block_address.sequence_no, "sequenceNo")?;
        let now = Utc::now();
        let (bucket, key) = locator_columns(&attrs.object_locator);

        let inserted = sqlx::query(
            r#"
            INSERT INTO evidence_records (
                evidence_id, provider_id, schema_id, object_bucket, object_key,
                table_id, table_name, strand_id, sequence_no, claimed_hash,
                latest_version, verification_status, last_verified_at,
                tx_id, tx_time, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'Unverified', NULL, ?, ?, ?, ?)
            ON CONFLICT (evidence_id) DO NOTHING
            "#,
        )
        .bind(&event.metadata.id)
        .bind(&attrs.provider_id)
        .bind(&attrs.schema_id)
        .bind(&bucket)
        .bind(&key)
        .bind(&event.table_id)
        .bind(&event.table_name)
        .bind(&event.block_address.strand_id)
        .bind(sequence_no)
        .bind(event.claimed_hash.to_base64())
        .bind(version)
        .bind(&event.metadata.tx_id)
        .bind(event.metadata.tx_time)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            debug!("Created evidence record {}", event.metadata.id);
            let record = Self::fetch_existing(pool, &event.metadata.id).await?;
            return Ok(UpsertOutcome::Created(record));
        }

        // Row already exists (possibly created by a concurrent ingest a
        // moment ago). Advance it only if this revision is strictly newer.
        let updated = sqlx::query(
            r#"
            UPDATE evidence_records SET
                provider_id = ?, schema_id = ?, object_bucket = ?, object_key = ?,
                table_id = ?, table_name = ?, strand_id = ?, sequence_no = ?,
                claimed_hash = ?, latest_version = ?, tx_id = ?, tx_time = ?,
                updated_at = ?
            WHERE evidence_id = ? AND latest_version < ?
            "#,
        )
        .bind(&attrs.provider_id)
        .bind(&attrs.schema_id)
        .bind(&bucket)
        .bind(&key)
        .bind(&event.table_id)
        .bind(&event.table_name)
        .bind(&event.block_address.strand_id)
        .bind(sequence_no)
        .bind(event.claimed_hash.to_base64())
        .bind(version)
        .bind(&event.metadata.tx_id)
        .bind(event.metadata.tx_time)
        .bind(now)
        .bind(&event.metadata.id)
        .bind(version)
        .execute(pool)
        .await?
        .rows_affected();

        let record = Self::fetch_existing(pool, &event.metadata.id).await?;
        if updated == 1 {
            debug!(
                "Advanced evidence record {} to version {}",
                event.metadata.id, event.metadata.version
            );
            Ok(UpsertOutcome::Updated(record))
        } else {
            debug!(
                "Duplicate or out-of-order delivery for {} (version {}, stored {})",
                event.metadata.id, event.metadata.version, record.latest_version
            );
            Ok(UpsertOutcome::Stale(record))
        }
    }

    /// Record a verification outcome for the given version. The write
    /// succeeds only while that version is still current; losing the race
    /// yields `ConcurrentUpdate` so the caller can refetch and recompute.
    pub async fn record_verification(
        pool: &SqlitePool,
        evidence_id: &str,
        version: u64,
        status: VerificationStatus,
        verified_at: DateTime<Utc>,
    ) -> Result<EvidenceRecord, EvidenceError> {
        let version = as_db_int(version, "version")?;
        let updated = sqlx::query(
            r#"
            UPDATE evidence_records
            SET verification_status = ?, last_verified_at = ?, updated_at = ?
            WHERE evidence_id = ? AND latest_version = ?
            "#,
        )
        .bind(status.as_str())
        .bind(verified_at)
        .bind(Utc::now())
        .bind(evidence_id)
        .bind(version)
        .execute(pool)
        .await?
        .rows_affected();

        if updated == 1 {
            return Self::fetch_existing(pool, evidence_id).await;
        }

        match Self::get_by_id(pool, evidence_id).await? {
            None => Err(EvidenceError::NotFound(evidence_id.to_string())),
            Some(record) => Err(EvidenceError::ConcurrentUpdate(format!(
                "version {} is stale for {}, stored version is {}",
                version, evidence_id, record.latest_version
            ))),
        }
    }

    async fn fetch_existing(
        pool: &SqlitePool,
        evidence_id: &str,
    ) -> Result<EvidenceRecord, EvidenceError> {
        Self::get_by_id(pool, evidence_id)
            .await?
            .ok_or_else(|| EvidenceError::NotFound(evidence_id.to_string()))
    }
}

/// SQLite INTEGER columns are signed; a value past `i64::MAX` would store
/// negative and break the `latest_version` ordering, so reject it at the
/// boundary.
fn as_db_int(value: u64, field: &str) -> Result<i64, EvidenceError> {
    i64::try_from(value).map_err(|_| {
        EvidenceError::MalformedRecord(format!("{} {} exceeds the storable range", field, value))
    })
}

fn locator_columns(locator: &Option<ObjectLocator>) -> (Option<String>, Option<String>) {
    match locator {
        Some(l) => (Some(l.bucket.clone()), Some(l.key.clone())),
        None => (None, None),
    }
}

fn map_row(row: sqlx::sqlite::SqliteRow) -> Result<EvidenceRecord, EvidenceError> {
    let object_locator = match (
        row.try_get::<Option<String>, _>("object_bucket")?,
        row.try_get::<Option<String>, _>("object_key")?,
    ) {
        (Some(bucket), Some(key)) => Some(ObjectLocator::new(&bucket, &key)),
        _ => None,
    };

    let status: String = row.try_get("verification_status")?;

    Ok(EvidenceRecord {
        evidence_id: row.try_get("evidence_id")?,
        provider_id: row.try_get("provider_id")?,
        schema_id: row.try_get("schema_id")?,
        object_locator,
        table_id: row.try_get("table_id")?,
        table_name: row.try_get("table_name")?,
        strand_id: row.try_get("strand_id")?,
        sequence_no: row.try_get::<i64, _>("sequence_no")? as u64,
        claimed_hash: row.try_get("claimed_hash")?,
        latest_version: row.try_get::<i64, _>("latest_version")? as u64,
        verification_status: VerificationStatus::parse(&status)?,
        last_verified_at: row.try_get("last_verified_at")?,
        tx_id: row.try_get("tx_id")?,
        tx_time: row.try_get("tx_time")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
