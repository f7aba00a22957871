//! Ledger-facing components: the revision event model, the change-stream
//! parser, the digest proof verifier, and the digest endpoint client.

pub mod client;
pub mod digest;
pub mod event;
pub mod parser;

pub use client::{DigestProvider, HttpDigestClient};
pub use digest::{verify_digest, DigestProof, VerificationOutcome};
pub use event::{BlockAddress, LedgerHash, RevisionEvent, RevisionMetadata};
pub use parser::parse_batch;
