//! Catalog Service - gRPC server
//!
//! Wires the stores, the auth layer, and the two gRPC services together and
//! serves them on one listener (TLS/mTLS optional).

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use tonic::transport::Server;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use grpc_auth::{AccessTable, AuthLayer, Role, TokenManager};

use catalog_service::catalog::v1::auth_service_server::AuthServiceServer;
use catalog_service::catalog::v1::catalog_service_server::CatalogServiceServer;
use catalog_service::grpc::{AuthServiceImpl, CatalogServiceImpl};
use catalog_service::store::{DiskImageStore, LaptopStore, RatingStore, User, UserStore};
use catalog_service::{tls, Config};

async fn seed_users(user_store: &UserStore) -> anyhow::Result<()> {
    user_store
        .save(User::new("admin1", "admin1", Role::Admin)?)
        .await?;
    user_store
        .save(User::new("user1", "user1", Role::User)?)
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    let addr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("invalid bind address")?;

    let token_manager = TokenManager::new(
        &config.auth.token_secret,
        Duration::seconds(config.auth.token_duration_secs),
    );

    let user_store = Arc::new(UserStore::new());
    seed_users(&user_store).await.context("failed to seed users")?;

    let laptop_store = Arc::new(LaptopStore::new());
    let rating_store = Arc::new(RatingStore::new());
    let image_store = Arc::new(DiskImageStore::new(config.storage.image_dir.clone()));

    let catalog = CatalogServiceImpl::new(laptop_store, image_store, rating_store);
    let auth = AuthServiceImpl::new(user_store, Arc::new(token_manager.clone()));
    let auth_layer = AuthLayer::new(token_manager, AccessTable::catalog_defaults());

    let mut builder = Server::builder();
    if let Some(tls_config) = tls::load_server_tls_config(&config.tls)? {
        builder = builder.tls_config(tls_config)?;
    } else {
        warn!("gRPC server TLS is DISABLED; set GRPC_TLS_ENABLED=true outside development");
    }

    info!(%addr, "starting catalog gRPC server");

    builder
        .layer(auth_layer)
        .add_service(CatalogServiceServer::new(catalog))
        .add_service(AuthServiceServer::new(auth))
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .context("gRPC server failed")?;

    Ok(())
}
