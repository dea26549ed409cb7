use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::utils::short_code::DEFAULT_MAX_ATTEMPTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    MongoDb,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_address: String,
    pub port: u16,
    /// Origin printed into QR images, e.g. `https://qr.example.com`.
    pub public_url: String,
    pub jwt_secret: String,
    pub storage: StorageBackend,
    pub mongodb_uri: String,
    pub database_name: String,
    pub accounting_timeout: Duration,
    pub short_code_max_attempts: usize,
    pub allowed_origins: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match get("PORT") {
            Some(port) => port.parse::<u16>().context("PORT must be a valid port number")?,
            None => 8080,
        };
        let storage = match get("STORAGE_BACKEND").as_deref() {
            None | Some("memory") => StorageBackend::Memory,
            Some("mongodb") | Some("mongo") => StorageBackend::MongoDb,
            Some(other) => bail!("Unknown STORAGE_BACKEND {other:?}, expected memory or mongodb"),
        };
        let accounting_timeout = match get("SCAN_ACCOUNTING_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse()
                    .context("SCAN_ACCOUNTING_TIMEOUT_MS must be a number of milliseconds")?,
            ),
            None => Duration::from_millis(2000),
        };
        let short_code_max_attempts = match get("SHORT_CODE_MAX_ATTEMPTS") {
            Some(n) => n.parse().context("SHORT_CODE_MAX_ATTEMPTS must be a number")?,
            None => DEFAULT_MAX_ATTEMPTS,
        };
        let allowed_origins = match get("CORS_ORIGINS") {
            Some(origins) => origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            // Default Vite dev and preview ports
            None => vec![
                "http://localhost:5173".to_string(),
                "http://localhost:4173".to_string(),
            ],
        };

        Ok(Self {
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            public_url: get("PUBLIC_URL")
                .or_else(|| get("HOST"))
                .unwrap_or_else(|| format!("http://localhost:{port}"))
                .trim_end_matches('/')
                .to_string(),
            jwt_secret: get("JWT_SECRET").context("JWT_SECRET not set")?,
            storage,
            mongodb_uri: get("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            database_name: get("DATABASE_NAME").unwrap_or_else(|| "dynqr".to_string()),
            accounting_timeout,
            short_code_max_attempts,
            allowed_origins,
        })
    }

    /// The URL a printed QR code encodes for `short_code`.
    pub fn scan_url(&self, short_code: &str) -> String {
        format!("{}/api/qr/{}", self.public_url, short_code)
    }
}
