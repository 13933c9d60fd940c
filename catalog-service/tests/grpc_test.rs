//! End-to-end tests against an in-process gRPC server
//!
//! Each test boots its own server on an ephemeral port with fresh stores, so
//! tests stay independent and can run in parallel.

use std::sync::Arc;

use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Channel, Server};
use tonic::{Code, Request};
use uuid::Uuid;

use grpc_auth::{AccessTable, AuthLayer, Role, TokenManager};

use catalog_service::catalog::v1::auth_service_client::AuthServiceClient;
use catalog_service::catalog::v1::auth_service_server::AuthServiceServer;
use catalog_service::catalog::v1::catalog_service_client::CatalogServiceClient;
use catalog_service::catalog::v1::catalog_service_server::CatalogServiceServer;
use catalog_service::catalog::v1::{
    memory, upload_image_request, CreateLaptopRequest, Filter, ImageInfo, LoginRequest, Memory,
    RateLaptopRequest, SearchLaptopRequest, UploadImageRequest,
};
use catalog_service::grpc::{AuthServiceImpl, CatalogServiceImpl};
use catalog_service::sample;
use catalog_service::store::{LaptopStore, MemoryImageStore, RatingStore, User, UserStore};
use catalog_service::MAX_CHUNK_SIZE;

const SECRET: &str = "integration-test-secret-0123456789";

struct TestServer {
    addr: String,
    laptop_store: Arc<LaptopStore>,
    image_store: Arc<MemoryImageStore>,
}

async fn start_server() -> TestServer {
    let token_manager = TokenManager::new(SECRET, chrono::Duration::seconds(60));

    let user_store = Arc::new(UserStore::new());
    user_store
        .save(User::new("admin1", "admin1", Role::Admin).unwrap())
        .await
        .unwrap();
    user_store
        .save(User::new("user1", "user1", Role::User).unwrap())
        .await
        .unwrap();

    let laptop_store = Arc::new(LaptopStore::new());
    let rating_store = Arc::new(RatingStore::new());
    let image_store = Arc::new(MemoryImageStore::new());

    let catalog =
        CatalogServiceImpl::new(laptop_store.clone(), image_store.clone(), rating_store);
    let auth = AuthServiceImpl::new(user_store, Arc::new(token_manager.clone()));
    let auth_layer = AuthLayer::new(token_manager, AccessTable::catalog_defaults());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        Server::builder()
            .layer(auth_layer)
            .add_service(CatalogServiceServer::new(catalog))
            .add_service(AuthServiceServer::new(auth))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    TestServer {
        addr: format!("http://{addr}"),
        laptop_store,
        image_store,
    }
}

async fn connect(server: &TestServer) -> Channel {
    Channel::from_shared(server.addr.clone())
        .unwrap()
        .connect()
        .await
        .unwrap()
}

async fn login(channel: Channel, username: &str, password: &str) -> String {
    let mut client = AuthServiceClient::new(channel);
    client
        .login(LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await
        .unwrap()
        .into_inner()
        .access_token
}

fn authed<T>(message: T, token: &str) -> Request<T> {
    let mut request = Request::new(message);
    request
        .metadata_mut()
        .insert("authorization", format!("Bearer {token}").parse().unwrap());
    request
}

#[tokio::test]
async fn admin_can_create_and_duplicate_is_rejected() {
    let server = start_server().await;
    let channel = connect(&server).await;
    let token = login(channel.clone(), "admin1", "admin1").await;
    let mut client = CatalogServiceClient::new(channel);

    let laptop = sample::new_laptop();
    let id = laptop.id.clone();

    let response = client
        .create_laptop(authed(
            CreateLaptopRequest {
                laptop: Some(laptop.clone()),
            },
            &token,
        ))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.id, id);

    let err = client
        .create_laptop(authed(
            CreateLaptopRequest {
                laptop: Some(laptop),
            },
            &token,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);

    // The stored laptop is unchanged by the rejected create.
    assert_eq!(server.laptop_store.find(&id).await.unwrap().id, id);
}

#[tokio::test]
async fn user_role_cannot_create() {
    let server = start_server().await;
    let channel = connect(&server).await;
    let token = login(channel.clone(), "user1", "user1").await;
    let mut client = CatalogServiceClient::new(channel);

    let err = client
        .create_laptop(authed(
            CreateLaptopRequest {
                laptop: Some(sample::new_laptop()),
            },
            &token,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::PermissionDenied);
}

#[tokio::test]
async fn create_without_token_is_unauthenticated() {
    let server = start_server().await;
    let mut client = CatalogServiceClient::new(connect(&server).await);

    let err = client
        .create_laptop(CreateLaptopRequest {
            laptop: Some(sample::new_laptop()),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn expired_token_is_unauthenticated() {
    let server = start_server().await;
    let mut client = CatalogServiceClient::new(connect(&server).await);

    let stale_manager = TokenManager::new(SECRET, chrono::Duration::seconds(-60));
    let token = stale_manager.issue("admin1", "admin").unwrap();

    let err = client
        .create_laptop(authed(
            CreateLaptopRequest {
                laptop: Some(sample::new_laptop()),
            },
            &token,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn malformed_laptop_id_is_invalid_argument() {
    let server = start_server().await;
    let channel = connect(&server).await;
    let token = login(channel.clone(), "admin1", "admin1").await;
    let mut client = CatalogServiceClient::new(channel);

    let mut laptop = sample::new_laptop();
    laptop.id = "not-a-uuid".to_string();

    let err = client
        .create_laptop(authed(
            CreateLaptopRequest {
                laptop: Some(laptop),
            },
            &token,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn server_generates_id_when_absent() {
    let server = start_server().await;
    let channel = connect(&server).await;
    let token = login(channel.clone(), "admin1", "admin1").await;
    let mut client = CatalogServiceClient::new(channel);

    let mut laptop = sample::new_laptop();
    laptop.id = String::new();

    let response = client
        .create_laptop(authed(
            CreateLaptopRequest {
                laptop: Some(laptop),
            },
            &token,
        ))
        .await
        .unwrap()
        .into_inner();
    assert!(Uuid::parse_str(&response.id).is_ok());
}

#[tokio::test]
async fn search_streams_only_matching_laptops() {
    let server = start_server().await;

    // Seed directly at the store: search itself is an open method.
    let mut expected = Vec::new();
    for i in 0..6 {
        let mut laptop = sample::new_laptop();
        if i < 2 {
            // Two laptops pinned to qualify for the filter below.
            laptop.price_usd = 1800.0;
            laptop.cpu.as_mut().unwrap().number_cores = 8;
            laptop.cpu.as_mut().unwrap().min_ghz = 3.0;
            laptop.ram = Some(Memory {
                value: 16,
                unit: memory::Unit::Gigabyte as i32,
            });
            expected.push(laptop.id.clone());
        } else {
            // The rest are pinned to fail on price.
            laptop.price_usd = 9999.0;
        }
        server.laptop_store.save(laptop, None).await.unwrap();
    }

    let mut client = CatalogServiceClient::new(connect(&server).await);
    let mut stream = client
        .search_laptop(SearchLaptopRequest {
            filter: Some(Filter {
                max_price_usd: 2000.0,
                min_cpu_cores: 4,
                min_cpu_ghz: 2.2,
                min_ram: Some(Memory {
                    value: 8,
                    unit: memory::Unit::Gigabyte as i32,
                }),
            }),
        })
        .await
        .unwrap()
        .into_inner();

    let mut found = Vec::new();
    while let Some(response) = stream.message().await.unwrap() {
        found.push(response.laptop.unwrap().id);
    }

    found.sort();
    expected.sort();
    assert_eq!(found, expected);
}

fn upload_messages(laptop_id: &str, chunks: Vec<Vec<u8>>) -> Vec<UploadImageRequest> {
    let mut messages = vec![UploadImageRequest {
        data: Some(upload_image_request::Data::Info(ImageInfo {
            laptop_id: laptop_id.to_string(),
            image_type: ".jpg".to_string(),
        })),
    }];
    messages.extend(chunks.into_iter().map(|chunk| UploadImageRequest {
        data: Some(upload_image_request::Data::ChunkData(chunk)),
    }));
    messages
}

#[tokio::test]
async fn upload_accumulates_all_chunks() {
    let server = start_server().await;
    let channel = connect(&server).await;
    let token = login(channel.clone(), "admin1", "admin1").await;
    let mut client = CatalogServiceClient::new(channel);

    let laptop = sample::new_laptop();
    let laptop_id = laptop.id.clone();
    server.laptop_store.save(laptop, None).await.unwrap();

    let chunks = vec![vec![1u8; 1000], vec![2u8; 2000], vec![3u8; 3000]];
    let response = client
        .upload_image(authed(
            tokio_stream::iter(upload_messages(&laptop_id, chunks)),
            &token,
        ))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.size, 6000);
    let stored = server.image_store.get(&response.id).await.unwrap();
    assert_eq!(stored.len(), 6000);
    assert_eq!(stored[0], 1u8);
    assert_eq!(stored[5999], 3u8);
}

#[tokio::test]
async fn oversized_chunk_is_rejected() {
    let server = start_server().await;
    let channel = connect(&server).await;
    let token = login(channel.clone(), "admin1", "admin1").await;
    let mut client = CatalogServiceClient::new(channel);

    let laptop = sample::new_laptop();
    let laptop_id = laptop.id.clone();
    server.laptop_store.save(laptop, None).await.unwrap();

    let chunks = vec![vec![0u8; MAX_CHUNK_SIZE + 1]];
    let err = client
        .upload_image(authed(
            tokio_stream::iter(upload_messages(&laptop_id, chunks)),
            &token,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn upload_for_unknown_laptop_is_not_found() {
    let server = start_server().await;
    let channel = connect(&server).await;
    let token = login(channel.clone(), "admin1", "admin1").await;
    let mut client = CatalogServiceClient::new(channel);

    let unknown = Uuid::new_v4().to_string();
    let err = client
        .upload_image(authed(
            tokio_stream::iter(upload_messages(&unknown, vec![vec![0u8; 16]])),
            &token,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn rating_stream_returns_running_averages() {
    let server = start_server().await;
    let channel = connect(&server).await;
    // RateLaptop is open to the "user" role as well.
    let token = login(channel.clone(), "user1", "user1").await;
    let mut client = CatalogServiceClient::new(channel);

    let laptop = sample::new_laptop();
    let laptop_id = laptop.id.clone();
    server.laptop_store.save(laptop, None).await.unwrap();

    let requests: Vec<_> = [8.0, 7.5, 10.0]
        .iter()
        .map(|score| RateLaptopRequest {
            laptop_id: laptop_id.clone(),
            score: *score,
        })
        .collect();

    let mut stream = client
        .rate_laptop(authed(tokio_stream::iter(requests), &token))
        .await
        .unwrap()
        .into_inner();

    let mut responses = Vec::new();
    while let Some(response) = stream.message().await.unwrap() {
        responses.push(response);
    }

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].rated_count, 1);
    assert!((responses[0].average_score - 8.0).abs() < 1e-9);
    assert_eq!(responses[1].rated_count, 2);
    assert!((responses[1].average_score - 7.75).abs() < 1e-9);
    assert_eq!(responses[2].rated_count, 3);
    assert!((responses[2].average_score - 8.5).abs() < 1e-9);
}

#[tokio::test]
async fn rating_unknown_laptop_fails_with_not_found() {
    let server = start_server().await;
    let channel = connect(&server).await;
    let token = login(channel.clone(), "user1", "user1").await;
    let mut client = CatalogServiceClient::new(channel);

    let requests = vec![RateLaptopRequest {
        laptop_id: Uuid::new_v4().to_string(),
        score: 5.0,
    }];

    let mut stream = client
        .rate_laptop(authed(tokio_stream::iter(requests), &token))
        .await
        .unwrap()
        .into_inner();

    let err = stream.message().await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthenticated() {
    let server = start_server().await;
    let mut client = AuthServiceClient::new(connect(&server).await);

    let err = client
        .login(LoginRequest {
            username: "admin1".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn login_with_unknown_user_is_not_found() {
    let server = start_server().await;
    let mut client = AuthServiceClient::new(connect(&server).await);

    let err = client
        .login(LoginRequest {
            username: "ghost".to_string(),
            password: "boo".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}
