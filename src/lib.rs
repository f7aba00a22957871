pub mod config;
pub mod database;
pub mod encoding;
pub mod error;
pub mod http;
pub mod ledger;
pub mod objectstore;
pub mod service;

pub use error::EvidenceError;
