//! Demo client: logs in, keeps its token fresh in the background, and
//! exercises every catalog RPC once.

use std::time::Duration;

use anyhow::Context;
use rand::RngCore;
use tonic::transport::Channel;
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalog_service::catalog::v1::{memory, Filter, Memory};
use catalog_service::client::{AuthClient, CatalogClient, ClientAuthInterceptor, LaptopRating};
use catalog_service::{sample, tls};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let addr =
        std::env::var("CATALOG_SERVER_ADDR").unwrap_or_else(|_| "http://127.0.0.1:8080".into());
    let username = std::env::var("CATALOG_USERNAME").unwrap_or_else(|_| "admin1".into());
    let password = std::env::var("CATALOG_PASSWORD").unwrap_or_else(|_| "admin1".into());
    let refresh_period = Duration::from_secs(
        std::env::var("TOKEN_REFRESH_PERIOD_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30),
    );

    let mut endpoint = Channel::from_shared(addr.clone()).context("invalid server address")?;
    if let Some(tls_config) = tls::load_client_tls_config_from_env()? {
        endpoint = endpoint.tls_config(tls_config)?;
    }
    let channel = endpoint.connect().await.context("failed to connect")?;

    info!(%addr, %username, "connected");

    let auth_client = AuthClient::new(channel.clone(), username, password);
    let interceptor = ClientAuthInterceptor::connect(auth_client, refresh_period).await?;
    let mut catalog = CatalogClient::new(channel, interceptor);

    // Create a handful of laptops.
    let laptops: Vec<_> = (0..3).map(|_| sample::new_laptop()).collect();
    let ids: Vec<String> = laptops.iter().map(|l| l.id.clone()).collect();
    for laptop in laptops {
        catalog.create_laptop(laptop).await?;
    }

    // Upload a small generated image for the first one.
    let mut image = vec![0u8; 2048];
    rand::thread_rng().fill_bytes(&mut image);
    catalog.upload_image(&ids[0], ".jpg", &image).await?;

    // Rate each laptop once.
    let ratings = ids
        .iter()
        .map(|id| LaptopRating {
            laptop_id: id.clone(),
            score: rand::Rng::gen_range(&mut rand::thread_rng(), 1.0..10.0),
        })
        .collect();
    catalog.rate_laptop(ratings).await?;

    // Search with a moderate filter.
    let filter = Filter {
        max_price_usd: 3000.0,
        min_cpu_cores: 4,
        min_cpu_ghz: 2.2,
        min_ram: Some(Memory {
            value: 8,
            unit: memory::Unit::Gigabyte as i32,
        }),
    };
    let found = catalog.search_laptop(filter).await?;
    info!(count = found.len(), "search finished");

    Ok(())
}
