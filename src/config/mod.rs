//! Configuration module for the Learning Hub backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Email domain allowed to sign up
    pub allowed_email_domain: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("HUB_API_PSK").ok();

        let db_path = env::var("HUB_DB_PATH")
            .unwrap_or_else(|_| "./data/hub.sqlite".to_string())
            .into();

        let index_path = env::var("HUB_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = env::var("HUB_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid HUB_BIND_ADDR format");

        let log_level = env::var("HUB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let allowed_email_domain =
            env::var("HUB_ALLOWED_EMAIL_DOMAIN").unwrap_or_else(|_| "example.org".to_string());

        Self {
            api_psk,
            db_path,
            index_path,
            bind_addr,
            log_level,
            allowed_email_domain,
        }
    }
}
