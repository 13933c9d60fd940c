//! Authenticated catalog client used by the demo binary

use std::time::Duration;

use anyhow::Context;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tonic::{Code, Request};
use tracing::info;

use crate::catalog::v1::catalog_service_client::CatalogServiceClient;
use crate::catalog::v1::{
    upload_image_request, CreateLaptopRequest, Filter, ImageInfo, Laptop, RateLaptopRequest,
    SearchLaptopRequest, UploadImageRequest, UploadImageResponse,
};
use crate::MAX_CHUNK_SIZE;

use super::ClientAuthInterceptor;

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LaptopRating {
    pub laptop_id: String,
    pub score: f64,
}

/// Catalog client with the auth interceptor attached to every call.
pub struct CatalogClient {
    service: CatalogServiceClient<InterceptedService<Channel, ClientAuthInterceptor>>,
}

impl CatalogClient {
    pub fn new(channel: Channel, interceptor: ClientAuthInterceptor) -> Self {
        Self {
            service: CatalogServiceClient::with_interceptor(channel, interceptor),
        }
    }

    /// Create a laptop; an `AlreadyExists` answer is reported, not fatal.
    pub async fn create_laptop(&mut self, laptop: Laptop) -> anyhow::Result<()> {
        let mut request = Request::new(CreateLaptopRequest {
            laptop: Some(laptop),
        });
        request.set_timeout(CALL_TIMEOUT);

        match self.service.create_laptop(request).await {
            Ok(response) => {
                info!(laptop_id = %response.into_inner().id, "laptop created");
                Ok(())
            }
            Err(status) if status.code() == Code::AlreadyExists => {
                info!("laptop already exists");
                Ok(())
            }
            Err(status) => Err(status).context("create laptop failed"),
        }
    }

    /// Run a filtered search and log each streamed match.
    pub async fn search_laptop(&mut self, filter: Filter) -> anyhow::Result<Vec<Laptop>> {
        let mut request = Request::new(SearchLaptopRequest {
            filter: Some(filter),
        });
        request.set_timeout(CALL_TIMEOUT);

        let mut stream = self
            .service
            .search_laptop(request)
            .await
            .context("search laptop failed")?
            .into_inner();

        let mut found = Vec::new();
        while let Some(response) = stream.message().await? {
            if let Some(laptop) = response.laptop {
                info!(laptop_id = %laptop.id, brand = %laptop.brand, "found laptop");
                found.push(laptop);
            }
        }

        Ok(found)
    }

    /// Upload an image for a laptop, chunked at the protocol's chunk ceiling.
    pub async fn upload_image(
        &mut self,
        laptop_id: &str,
        image_type: &str,
        data: &[u8],
    ) -> anyhow::Result<UploadImageResponse> {
        let mut messages = vec![UploadImageRequest {
            data: Some(upload_image_request::Data::Info(ImageInfo {
                laptop_id: laptop_id.to_string(),
                image_type: image_type.to_string(),
            })),
        }];
        messages.extend(data.chunks(MAX_CHUNK_SIZE).map(|chunk| UploadImageRequest {
            data: Some(upload_image_request::Data::ChunkData(chunk.to_vec())),
        }));

        let response = self
            .service
            .upload_image(Request::new(tokio_stream::iter(messages)))
            .await
            .context("upload image failed")?
            .into_inner();

        info!(image_id = %response.id, size = response.size, "image uploaded");
        Ok(response)
    }

    /// Send a batch of ratings and drain the streamed responses.
    pub async fn rate_laptop(&mut self, ratings: Vec<LaptopRating>) -> anyhow::Result<()> {
        let requests: Vec<_> = ratings
            .into_iter()
            .map(|r| RateLaptopRequest {
                laptop_id: r.laptop_id,
                score: r.score,
            })
            .collect();

        let mut stream = self
            .service
            .rate_laptop(Request::new(tokio_stream::iter(requests)))
            .await
            .context("rate laptop failed")?
            .into_inner();

        while let Some(response) = stream.message().await? {
            info!(
                laptop_id = %response.laptop_id,
                rated_count = response.rated_count,
                average_score = response.average_score,
                "rating acknowledged"
            );
        }

        Ok(())
    }
}
