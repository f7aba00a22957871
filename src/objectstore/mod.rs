//! Object Locator
//!
//! Canonical locators for evidence payloads held in off-ledger object
//! storage, and time-limited signed retrieval URLs. The store addresses
//! objects as `https://{bucket}.{host}/{key}`.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::EvidenceError;

/// Bucket + key pair addressing one payload object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocator {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocator {
    /// Bucket names are case-insensitive in the store; normalize to lower
    /// case so locators compare canonically.
    pub fn new(bucket: &str, key: &str) -> Self {
        Self {
            bucket: bucket.to_lowercase(),
            key: key.trim_start_matches('/').to_string(),
        }
    }

    /// Build the canonical retrieval URL for this locator.
    pub fn url(&self, host: &str) -> String {
        format!("https://{}.{}/{}", self.bucket, host, self.key)
    }

    /// Parse a canonical retrieval URL back into bucket and key. The host
    /// must carry a bucket label in front of at least a two-label domain,
    /// and the path must be non-empty.
    pub fn parse(url: &str) -> Result<Self, EvidenceError> {
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| {
                EvidenceError::InvalidLocator(format!("missing URL scheme: {}", url))
            })?;

        let (host, key) = rest.split_once('/').ok_or_else(|| {
            EvidenceError::InvalidLocator(format!("missing key path: {}", url))
        })?;

        let (bucket, domain) = host.split_once('.').ok_or_else(|| {
            EvidenceError::InvalidLocator(format!("missing bucket segment: {}", url))
        })?;
        if bucket.is_empty() || !domain.contains('.') {
            return Err(EvidenceError::InvalidLocator(format!(
                "missing bucket segment: {}",
                url
            )));
        }
        if key.is_empty() {
            return Err(EvidenceError::InvalidLocator(format!(
                "empty object key: {}",
                url
            )));
        }

        Ok(Self::new(bucket, key))
    }
}

/// Off-ledger object store endpoint. Holds the store host and the key
/// material used to sign retrieval URLs.
pub struct ObjectStore {
    host: String,
    signing_key: String,
}

impl ObjectStore {
    pub fn new(host: String, signing_key: String) -> Self {
        Self { host, signing_key }
    }

    pub fn url(&self, locator: &ObjectLocator) -> String {
        locator.url(&self.host)
    }

    /// Mint a retrieval URL valid for `ttl_secs` from now. The signature
    /// covers bucket, key and expiry, keyed by the store's signing secret.
    pub fn signed_url(&self, locator: &ObjectLocator, ttl_secs: i64) -> String {
        let expires = (Utc::now() + Duration::seconds(ttl_secs)).timestamp();
        let signature = self.sign(locator, expires);
        debug!(
            "Signed URL for {}/{} expiring at {}",
            locator.bucket, locator.key, expires
        );
        format!(
            "{}?expires={}&signature={}",
            self.url(locator),
            expires,
            signature
        )
    }

    fn sign(&self, locator: &ObjectLocator, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.signing_key.as_bytes());
        hasher.update(b"\n");
        hasher.update(locator.bucket.as_bytes());
        hasher.update(b"\n");
        hasher.update(locator.key.as_bytes());
        hasher.update(b"\n");
        hasher.update(expires.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}
