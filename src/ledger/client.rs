//! Ledger Digest Client
//!
//! Fetches fresh digest proofs from the ledger's digest endpoint. The
//! endpoint is an external collaborator; it is injected behind the
//! [`DigestProvider`] trait so the verification service and its tests can
//! substitute it directly.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::EvidenceError;
use crate::ledger::digest::DigestProof;
use crate::ledger::event::BlockAddress;

/// Source of digest proofs for committed revisions.
pub trait DigestProvider: Send + Sync {
    fn get_digest_proof(
        &self,
        table_id: &str,
        block_address: &BlockAddress,
    ) -> impl Future<Output = Result<DigestProof, EvidenceError>> + Send;
}

/// Wire shape of the digest endpoint response.
#[derive(Debug, Deserialize)]
struct DigestProofWire {
    digest: String,
    #[serde(default)]
    proof: Vec<String>,
}

/// HTTP implementation over the ledger's digest endpoint. Every request
/// carries the configured timeout; a timed-out or failed fetch surfaces
/// as a transient error and leaves no state behind.
pub struct HttpDigestClient {
    endpoint_url: String,
    http_client: Client,
}

impl HttpDigestClient {
    pub fn new(endpoint_url: String, timeout: Duration) -> Result<Self, EvidenceError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EvidenceError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            endpoint_url,
            http_client,
        })
    }
}

impl DigestProvider for HttpDigestClient {
    fn get_digest_proof(
        &self,
        table_id: &str,
        block_address: &BlockAddress,
    ) -> impl Future<Output = Result<DigestProof, EvidenceError>> + Send {
        let url = format!("{}/digest", self.endpoint_url);
        let request = self.http_client.get(&url).query(&[
            ("tableId", table_id),
            ("strandId", &block_address.strand_id),
            ("sequenceNo", &block_address.sequence_no.to_string()),
        ]);

        async move {
            debug!("Fetching digest proof from {}", url);

            let response = request.send().await.map_err(|e| {
                warn!("Digest endpoint unreachable: {}", e);
                EvidenceError::Transient(format!("digest endpoint: {}", e))
            })?;

            if !response.status().is_success() {
                return Err(EvidenceError::Transient(format!(
                    "digest endpoint returned {}",
                    response.status()
                )));
            }

            let wire: DigestProofWire = response.json().await.map_err(|e| {
                EvidenceError::Transient(format!("digest endpoint body: {}", e))
            })?;

            DigestProof::from_base64(&wire.digest, &wire.proof)
        }
    }
}
