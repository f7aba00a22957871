//! Encoding Utilities
//!
//! One-way content hashing and base64 / base64url alphabet conversion
//! for ledger hashes carried in change-stream records and digest proofs.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

use crate::error::EvidenceError;

/// SHA-256 digest of arbitrary bytes. Fixed 32-byte output.
pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Encode raw bytes with the standard base64 alphabet (padded).
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a standard-alphabet base64 string.
pub fn from_base64(encoded: &str) -> Result<Vec<u8>, EvidenceError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| EvidenceError::MalformedRecord(format!("invalid base64: {}", e)))
}

/// Convert a standard base64 encoding to the URL-safe alphabet:
/// `+` becomes `-`, `/` becomes `_`, padding is stripped.
pub fn to_url_safe(base64: &str) -> String {
    base64
        .trim_end_matches('=')
        .replace('+', "-")
        .replace('/', "_")
}

/// Invert [`to_url_safe`]: restore the standard alphabet and re-pad to a
/// multiple of four. Round-trips any valid standard base64 input exactly.
pub fn from_url_safe(url_safe: &str) -> Result<String, EvidenceError> {
    let mut restored = url_safe.replace('-', "+").replace('_', "/");
    match restored.len() % 4 {
        0 => {}
        2 => restored.push_str("=="),
        3 => restored.push('='),
        _ => {
            return Err(EvidenceError::MalformedRecord(format!(
                "base64url string has invalid length {}",
                url_safe.len()
            )))
        }
    }
    // Reject anything that still fails to decode after restoration.
    STANDARD
        .decode(&restored)
        .map_err(|e| EvidenceError::MalformedRecord(format!("invalid base64url: {}", e)))?;
    Ok(restored)
}
