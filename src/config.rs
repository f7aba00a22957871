use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub digest_endpoint_url: String,
    pub digest_timeout_secs: u64,
    pub object_store_host: String,
    pub object_store_signing_key: String,
    pub signed_url_ttl_secs: i64,
    pub server_host: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://evidence.db".to_string());

        let digest_endpoint_url = env::var("DIGEST_ENDPOINT_URL")
            .unwrap_or_else(|_| "http://localhost:4100".to_string());

        let digest_timeout_secs = env::var("DIGEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;

        let object_store_host = env::var("OBJECT_STORE_HOST")
            .unwrap_or_else(|_| "store.example".to_string());

        let object_store_signing_key = env::var("OBJECT_STORE_SIGNING_KEY")
            .unwrap_or_else(|_| "dev-signing-key".to_string());

        let signed_url_ttl_secs = env::var("SIGNED_URL_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()?;

        let server_host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        Ok(AppConfig {
            database_url,
            digest_endpoint_url,
            digest_timeout_secs,
            object_store_host,
            object_store_signing_key,
            signed_url_ttl_secs,
            server_host,
            server_port,
        })
    }
}
