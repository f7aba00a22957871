//! Stream Record Parser
//!
//! Decodes raw change-stream entries into typed [`RevisionEvent`]s.
//! Dispatch is a plain function table keyed by the record kind tag, so
//! tests can substitute handlers without any subclass machinery. Entries
//! of other kinds are dropped; entries that claim the revision-details
//! kind but fail structural decoding yield a per-entry error and the
//! caller decides whether to skip or abort.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EvidenceError;
use crate::ledger::event::{
    BlockAddress, LedgerHash, RevisionEvent, RevisionMetadata, REVISION_DETAILS_KIND,
};

type DecodeFn = fn(Value) -> Result<RevisionEvent, EvidenceError>;

/// Function table from record kind to decoder.
pub struct RecordRouter {
    routes: HashMap<&'static str, DecodeFn>,
}

impl Default for RecordRouter {
    fn default() -> Self {
        let mut routes: HashMap<&'static str, DecodeFn> = HashMap::new();
        routes.insert(REVISION_DETAILS_KIND, decode_revision_details);
        Self { routes }
    }
}

impl RecordRouter {
    pub fn route(&self, kind: &str) -> Option<DecodeFn> {
        self.routes.get(kind).copied()
    }
}

/// Lazy, single-pass stream over one raw batch. Not restartable; each
/// batch is consumed once.
pub struct RecordStream {
    entries: std::vec::IntoIter<Value>,
    router: RecordRouter,
}

impl RecordStream {
    pub fn new(entries: Vec<Value>) -> Self {
        Self {
            entries: entries.into_iter(),
            router: RecordRouter::default(),
        }
    }
}

impl Iterator for RecordStream {
    type Item = Result<RevisionEvent, EvidenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            let kind = match entry.get("kind").and_then(|v| v.as_str()) {
                Some(kind) => kind.to_string(),
                None => {
                    return Some(Err(EvidenceError::MalformedRecord(
                        "stream entry is missing the record kind tag".to_string(),
                    )))
                }
            };

            match self.router.route(&kind) {
                Some(decode) => return Some(decode(entry)),
                None => {
                    debug!("Dropping stream entry of kind {}", kind);
                    continue;
                }
            }
        }
        None
    }
}

/// Parse a raw batch into revision events, preserving batch order.
pub fn parse_batch(entries: Vec<Value>) -> RecordStream {
    RecordStream::new(entries)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevisionDetailsWire {
    stream_source_id: String,
    table_name: String,
    table_id: String,
    block_address: BlockAddress,
    hash: String,
    #[serde(default)]
    payload: Value,
    revision_metadata: RevisionMetadata,
}

fn decode_revision_details(entry: Value) -> Result<RevisionEvent, EvidenceError> {
    let wire: RevisionDetailsWire = serde_json::from_value(entry).map_err(|e| {
        warn!("Malformed revision-details entry: {}", e);
        EvidenceError::MalformedRecord(format!("revision-details decode failed: {}", e))
    })?;

    // Hash length is validated here so a bad record never reaches the
    // verifier as a proof error.
    let claimed_hash = LedgerHash::from_base64(&wire.hash)
        .map_err(|e| EvidenceError::MalformedRecord(e.to_string()))?;

    Ok(RevisionEvent {
        stream_source_id: wire.stream_source_id,
        table_name: wire.table_name,
        table_id: wire.table_id,
        block_address: wire.block_address,
        claimed_hash,
        payload: wire.payload,
        metadata: wire.revision_metadata,
    })
}
