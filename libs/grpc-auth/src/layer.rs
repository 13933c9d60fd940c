//! Server-side authorization layer
//!
//! A tower layer wrapping the whole gRPC router, so unary and streaming calls
//! go through the exact same check. Authorization runs once per call, before
//! the handler; for streams no per-message re-check happens.
//!
//! Per call the flow is: method lookup -> metadata extraction -> bearer token
//! -> signature/expiry verification -> role check -> admit. Any step may
//! short-circuit into a trailers-only gRPC rejection that never reaches the
//! inner service.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::header::HeaderMap;
use tonic::body::BoxBody;
use tonic::Status;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::access::AccessTable;
use crate::token::TokenManager;
use crate::AUTHORIZATION_KEY;

/// Tower layer enforcing the access table on every inbound call.
#[derive(Clone)]
pub struct AuthLayer {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    token_manager: TokenManager,
    access: AccessTable,
}

impl AuthLayer {
    pub fn new(token_manager: TokenManager, access: AccessTable) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                token_manager,
                access,
            }),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, service: S) -> Self::Service {
        AuthService {
            inner: service,
            auth: self.inner.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    auth: Arc<AuthInner>,
}

impl AuthInner {
    /// The state machine behind every admission decision.
    ///
    /// Methods absent from the access table are admitted unconditionally.
    fn authorize(&self, path: &str, headers: &HeaderMap) -> Result<(), Status> {
        let Some(allowed) = self.access.roles_for(path) else {
            return Ok(());
        };

        let value = headers.get(AUTHORIZATION_KEY).ok_or_else(|| {
            warn!(method = path, "missing authorization metadata");
            Status::unauthenticated("missing authorization metadata")
        })?;

        let value = value.to_str().map_err(|_| {
            warn!(method = path, "authorization metadata is not valid ASCII");
            Status::unauthenticated("invalid authorization metadata")
        })?;

        let token = value.strip_prefix("Bearer ").unwrap_or(value);
        if token.is_empty() {
            warn!(method = path, "empty bearer token");
            return Err(Status::unauthenticated("empty bearer token"));
        }

        let claims = self.token_manager.verify(token).map_err(|e| {
            warn!(method = path, error = %e, "token verification failed");
            Status::unauthenticated(format!("invalid token: {e}"))
        })?;

        if allowed.iter().any(|role| role.matches(&claims.role)) {
            debug!(method = path, user = %claims.sub, role = %claims.role, "call admitted");
            Ok(())
        } else {
            warn!(method = path, user = %claims.sub, role = %claims.role, "role not permitted");
            Err(Status::permission_denied(
                "caller role is not permitted to invoke this method",
            ))
        }
    }
}

/// Trailers-only gRPC response carrying the rejection status.
fn rejection(status: Status) -> http::Response<BoxBody> {
    let mut response = http::Response::new(tonic::body::empty_body());
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/grpc"),
    );
    if status.add_header(response.headers_mut()).is_err() {
        response
            .headers_mut()
            .insert("grpc-status", http::HeaderValue::from(status.code() as i32));
    }
    response
}

impl<S, ReqBody> Service<http::Request<ReqBody>> for AuthService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<BoxBody>>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let auth = self.auth.clone();
        // Swap in the clone so the original (polled-ready) service handles
        // this request. Standard tower readiness dance.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match auth.authorize(req.uri().path(), req.headers()) {
                Ok(()) => inner.call(req).await,
                Err(status) => Ok(rejection(status)),
            }
        })
    }
}
