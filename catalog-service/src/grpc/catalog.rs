//! CatalogService: create, streamed search, chunked upload, rating exchange
//!
//! Handlers are reentrant and keep no per-call state outside their stack
//! frame; every piece of shared state lives in a store injected at
//! construction time. Within one streaming call messages are processed
//! strictly in arrival order; the caller's deadline is re-checked before each
//! receive so an expired call fails fast instead of blocking on the stream.

use std::sync::Arc;
use std::time::Instant;

use bytes::BytesMut;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::v1::catalog_service_server::CatalogService;
use crate::catalog::v1::{
    upload_image_request, CreateLaptopRequest, CreateLaptopResponse, RateLaptopRequest,
    RateLaptopResponse, SearchLaptopRequest, SearchLaptopResponse, UploadImageRequest,
    UploadImageResponse,
};
use crate::deadline;
use crate::store::{ImageStore, LaptopStore, RatingStore};
use crate::MAX_CHUNK_SIZE;

#[derive(Clone)]
pub struct CatalogServiceImpl {
    laptop_store: Arc<LaptopStore>,
    image_store: Arc<dyn ImageStore>,
    rating_store: Arc<RatingStore>,
}

impl CatalogServiceImpl {
    pub fn new(
        laptop_store: Arc<LaptopStore>,
        image_store: Arc<dyn ImageStore>,
        rating_store: Arc<RatingStore>,
    ) -> Self {
        Self {
            laptop_store,
            image_store,
            rating_store,
        }
    }

    async fn rate_loop(
        laptop_store: Arc<LaptopStore>,
        rating_store: Arc<RatingStore>,
        mut stream: Streaming<RateLaptopRequest>,
        tx: mpsc::Sender<Result<RateLaptopResponse, Status>>,
        deadline: Option<Instant>,
    ) -> Result<(), Status> {
        loop {
            deadline::check(deadline)?;

            let Some(req) = stream.message().await? else {
                // Client half-closed: clean termination.
                return Ok(());
            };

            debug!(laptop_id = %req.laptop_id, score = req.score, "received rating");

            require_exists(&laptop_store, &req.laptop_id).await?;

            let rating = rating_store.add(&req.laptop_id, req.score).await;
            let response = RateLaptopResponse {
                laptop_id: req.laptop_id,
                rated_count: rating.count,
                average_score: rating.sum / rating.count as f64,
            };

            tx.send(Ok(response))
                .await
                .map_err(|_| Status::cancelled("client stopped receiving rating responses"))?;
        }
    }
}

async fn require_exists(store: &LaptopStore, laptop_id: &str) -> Result<(), Status> {
    store
        .find(laptop_id)
        .await
        .map(|_| ())
        .map_err(|_| Status::not_found(format!("laptop {laptop_id} not found")))
}

#[tonic::async_trait]
impl CatalogService for CatalogServiceImpl {
    #[tracing::instrument(skip(self, request))]
    async fn create_laptop(
        &self,
        request: Request<CreateLaptopRequest>,
    ) -> Result<Response<CreateLaptopResponse>, Status> {
        let call_deadline = deadline::from_metadata(request.metadata());
        let mut laptop = request
            .into_inner()
            .laptop
            .ok_or_else(|| Status::invalid_argument("laptop is required"))?;

        if laptop.id.is_empty() {
            laptop.id = Uuid::new_v4().to_string();
        } else {
            Uuid::parse_str(&laptop.id).map_err(|e| {
                Status::invalid_argument(format!("laptop id is not a valid UUID: {e}"))
            })?;
        }

        let id = laptop.id.clone();
        self.laptop_store.save(laptop, call_deadline).await?;

        info!(laptop_id = %id, "laptop created");
        Ok(Response::new(CreateLaptopResponse { id }))
    }

    type SearchLaptopStream = ReceiverStream<Result<SearchLaptopResponse, Status>>;

    async fn search_laptop(
        &self,
        request: Request<SearchLaptopRequest>,
    ) -> Result<Response<Self::SearchLaptopStream>, Status> {
        let filter = request.into_inner().filter.unwrap_or_default();
        info!(?filter, "search started");

        let (tx, rx) = mpsc::channel(16);
        let store = self.laptop_store.clone();

        tokio::spawn(async move {
            // A failed send means the client went away; the visitor error
            // aborts the scan immediately.
            let result = store
                .search(&filter, |laptop| {
                    let tx = tx.clone();
                    async move {
                        tx.send(Ok(SearchLaptopResponse {
                            laptop: Some(laptop),
                        }))
                        .await
                    }
                })
                .await;

            if result.is_err() {
                debug!("search aborted: response stream closed");
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn upload_image(
        &self,
        request: Request<Streaming<UploadImageRequest>>,
    ) -> Result<Response<UploadImageResponse>, Status> {
        let call_deadline = deadline::from_metadata(request.metadata());
        let mut stream = request.into_inner();

        let first = stream
            .message()
            .await?
            .ok_or_else(|| Status::invalid_argument("upload stream is empty"))?;
        let info = match first.data {
            Some(upload_image_request::Data::Info(info)) => info,
            _ => {
                return Err(Status::invalid_argument(
                    "first upload message must carry the image info",
                ))
            }
        };

        info!(laptop_id = %info.laptop_id, image_type = %info.image_type, "upload started");
        require_exists(&self.laptop_store, &info.laptop_id).await?;

        let mut image_data = BytesMut::new();
        loop {
            deadline::check(call_deadline)?;

            let Some(req) = stream.message().await? else {
                break;
            };
            let chunk = match req.data {
                Some(upload_image_request::Data::ChunkData(chunk)) => chunk,
                _ => return Err(Status::invalid_argument("expected a data chunk")),
            };

            if chunk.len() > MAX_CHUNK_SIZE {
                warn!(size = chunk.len(), "oversized upload chunk rejected");
                return Err(Status::invalid_argument(format!(
                    "chunk of {} bytes exceeds the {MAX_CHUNK_SIZE} byte limit",
                    chunk.len()
                )));
            }

            image_data.extend_from_slice(&chunk);
            debug!(total = image_data.len(), "chunk accumulated");
        }

        let size = image_data.len() as u32;
        let id = self
            .image_store
            .save(&info.laptop_id, &info.image_type, image_data.freeze())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to persist image");
                Status::internal("failed to persist image")
            })?;

        info!(image_id = %id, size, "upload completed");
        Ok(Response::new(UploadImageResponse { id, size }))
    }

    type RateLaptopStream = ReceiverStream<Result<RateLaptopResponse, Status>>;

    async fn rate_laptop(
        &self,
        request: Request<Streaming<RateLaptopRequest>>,
    ) -> Result<Response<Self::RateLaptopStream>, Status> {
        let call_deadline = deadline::from_metadata(request.metadata());
        let stream = request.into_inner();

        let (tx, rx) = mpsc::channel(16);
        let laptop_store = self.laptop_store.clone();
        let rating_store = self.rating_store.clone();

        tokio::spawn(async move {
            if let Err(status) =
                Self::rate_loop(laptop_store, rating_store, stream, tx.clone(), call_deadline)
                    .await
            {
                // Surface the failure on the response stream; if the client is
                // gone there is nobody left to tell.
                let _ = tx.send(Err(status)).await;
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
