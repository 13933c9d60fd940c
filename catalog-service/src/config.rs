//! Configuration management for catalog-service
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub tls: TlsConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_duration_secs: i64,
    pub refresh_period_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    pub image_dir: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub client_ca_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            app: AppConfig {
                host: std::env::var("CATALOG_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("CATALOG_SERVICE_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .unwrap_or(8080),
            },
            auth: AuthConfig {
                token_secret: std::env::var("TOKEN_SECRET")
                    .map_err(|_| anyhow::anyhow!("TOKEN_SECRET is required"))?,
                token_duration_secs: std::env::var("TOKEN_DURATION_SECS")
                    .unwrap_or_else(|_| "900".to_string())
                    .parse()
                    .unwrap_or(900),
                refresh_period_secs: std::env::var("TOKEN_REFRESH_PERIOD_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .unwrap_or(600),
            },
            storage: StorageConfig {
                image_dir: std::env::var("IMAGE_DIR").unwrap_or_else(|_| "./img".to_string()),
            },
            tls: TlsConfig {
                enabled: std::env::var("GRPC_TLS_ENABLED")
                    .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
                    .unwrap_or(false),
                cert_path: std::env::var("GRPC_SERVER_CERT_PATH").ok(),
                key_path: std::env::var("GRPC_SERVER_KEY_PATH").ok(),
                client_ca_path: std::env::var("GRPC_CLIENT_CA_CERT_PATH").ok(),
            },
        })
    }
}
