//! TLS / mTLS configuration loading
//!
//! TLS is optional and off by default for local development. When a client CA
//! is configured the server requires and verifies client certificates
//! (mutual TLS); otherwise it presents its own certificate only.

use anyhow::Context;
use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};
use tracing::info;

use crate::config::TlsConfig;

pub fn load_server_tls_config(config: &TlsConfig) -> anyhow::Result<Option<ServerTlsConfig>> {
    if !config.enabled {
        return Ok(None);
    }

    let cert_path = config
        .cert_path
        .as_deref()
        .context("GRPC_SERVER_CERT_PATH is required when GRPC_TLS_ENABLED=true")?;
    let key_path = config
        .key_path
        .as_deref()
        .context("GRPC_SERVER_KEY_PATH is required when GRPC_TLS_ENABLED=true")?;

    let cert = std::fs::read(cert_path)
        .with_context(|| format!("failed to read server cert {cert_path}"))?;
    let key =
        std::fs::read(key_path).with_context(|| format!("failed to read server key {key_path}"))?;

    let mut tls_config = ServerTlsConfig::new().identity(Identity::from_pem(cert, key));

    if let Some(ca_path) = config.client_ca_path.as_deref() {
        let ca = std::fs::read(ca_path)
            .with_context(|| format!("failed to read client CA cert {ca_path}"))?;
        tls_config = tls_config.client_ca_root(Certificate::from_pem(ca));
        info!("gRPC server mTLS enabled (client cert required)");
    } else {
        info!("gRPC server TLS enabled (server cert only)");
    }

    Ok(Some(tls_config))
}

/// Client-side counterpart, driven by the same env variable family:
/// `GRPC_TLS_ENABLED`, `GRPC_CA_CERT_PATH`, and for mTLS
/// `GRPC_CLIENT_CERT_PATH`/`GRPC_CLIENT_KEY_PATH`.
pub fn load_client_tls_config_from_env() -> anyhow::Result<Option<ClientTlsConfig>> {
    let enabled = std::env::var("GRPC_TLS_ENABLED")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
        .unwrap_or(false);
    if !enabled {
        return Ok(None);
    }

    let ca_path = std::env::var("GRPC_CA_CERT_PATH")
        .context("GRPC_CA_CERT_PATH is required when GRPC_TLS_ENABLED=true")?;
    let ca = std::fs::read(&ca_path)
        .with_context(|| format!("failed to read CA cert {ca_path}"))?;

    let mut tls_config = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(ca));

    if let Ok(domain) = std::env::var("GRPC_TLS_DOMAIN") {
        tls_config = tls_config.domain_name(domain);
    }

    if let (Ok(cert_path), Ok(key_path)) = (
        std::env::var("GRPC_CLIENT_CERT_PATH"),
        std::env::var("GRPC_CLIENT_KEY_PATH"),
    ) {
        let cert = std::fs::read(&cert_path)
            .with_context(|| format!("failed to read client cert {cert_path}"))?;
        let key = std::fs::read(&key_path)
            .with_context(|| format!("failed to read client key {key_path}"))?;
        tls_config = tls_config.identity(Identity::from_pem(cert, key));
        info!("gRPC client mTLS enabled");
    }

    Ok(Some(tls_config))
}
