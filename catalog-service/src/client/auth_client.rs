//! Login client used by the token refresh loop

use std::time::Duration;

use tonic::transport::Channel;
use tonic::Request;

use crate::catalog::v1::auth_service_client::AuthServiceClient;
use crate::catalog::v1::LoginRequest;

const LOGIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Thin wrapper around the generated auth client holding the credentials it
/// re-authenticates with.
#[derive(Clone)]
pub struct AuthClient {
    service: AuthServiceClient<Channel>,
    username: String,
    password: String,
}

impl AuthClient {
    pub fn new(channel: Channel, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            service: AuthServiceClient::new(channel),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Authenticate and return a fresh access token.
    pub async fn login(&mut self) -> Result<String, tonic::Status> {
        let mut request = Request::new(LoginRequest {
            username: self.username.clone(),
            password: self.password.clone(),
        });
        request.set_timeout(LOGIN_TIMEOUT);

        let response = self.service.login(request).await?;
        Ok(response.into_inner().access_token)
    }
}
