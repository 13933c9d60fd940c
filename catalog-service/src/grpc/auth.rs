//! AuthService: credential check and token issuance

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{info, warn};

use grpc_auth::TokenManager;

use crate::catalog::v1::auth_service_server::AuthService;
use crate::catalog::v1::{LoginRequest, LoginResponse};
use crate::store::UserStore;

pub struct AuthServiceImpl {
    user_store: Arc<UserStore>,
    token_manager: Arc<TokenManager>,
}

impl AuthServiceImpl {
    pub fn new(user_store: Arc<UserStore>, token_manager: Arc<TokenManager>) -> Self {
        Self {
            user_store,
            token_manager,
        }
    }
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();

        let user = self.user_store.find(&req.username).await.ok_or_else(|| {
            warn!(username = %req.username, "login for unknown user");
            Status::not_found("unknown username")
        })?;

        let correct = user.is_correct_password(&req.password).map_err(|e| {
            tracing::error!(error = %e, "credential check failed");
            Status::internal("credential check failed")
        })?;
        if !correct {
            warn!(username = %req.username, "incorrect password");
            return Err(Status::unauthenticated("incorrect username or password"));
        }

        let access_token = self
            .token_manager
            .issue(&user.username, user.role.as_str())
            .map_err(|e| {
                tracing::error!(error = %e, "token issuance failed");
                Status::internal("cannot issue access token")
            })?;

        info!(username = %user.username, role = user.role.as_str(), "login succeeded");
        Ok(Response::new(LoginResponse { access_token }))
    }
}
