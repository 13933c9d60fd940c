//! JWT issuance and verification
//!
//! Symmetric HS256 signing via `jsonwebtoken`. The manager is stateless apart
//! from the shared secret: verification never touches a store, so it can run
//! on every call without contention.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried by every issued token.
///
/// Value type: produced fresh per login and never mutated after signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Subject (username)
    pub sub: String,
    /// Role name ("admin", "user")
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl UserClaims {
    /// A token is only as good as its claims: both identity fields must be set.
    pub fn is_well_formed(&self) -> bool {
        !self.sub.is_empty() && !self.role.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signature or signing method mismatch")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token claims are malformed")]
    MalformedClaims,
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Issues and verifies signed, time-limited claims using a shared secret.
#[derive(Clone)]
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    token_duration: Duration,
}

impl TokenManager {
    pub fn new(secret: &str, token_duration: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No clock-skew grace: an expired token is expired.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_duration,
        }
    }

    /// Issue a token for the given identity, expiring after the configured
    /// duration.
    pub fn issue(&self, username: &str, role: &str) -> Result<String, TokenError> {
        let claims = UserClaims {
            sub: username.to_string(),
            role: role.to_string(),
            exp: (Utc::now() + self.token_duration).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)
    }

    /// Verify a token and return its claims.
    ///
    /// Fails with [`TokenError::InvalidSignature`] on a signature or algorithm
    /// mismatch, [`TokenError::Expired`] past expiry, and
    /// [`TokenError::MalformedClaims`] when the payload does not decode or the
    /// username/role is empty.
    pub fn verify(&self, token: &str) -> Result<UserClaims, TokenError> {
        let data = decode::<UserClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName => TokenError::InvalidSignature,
                _ => TokenError::MalformedClaims,
            }
        })?;

        if !data.claims.is_well_formed() {
            return Err(TokenError::MalformedClaims);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(duration_secs: i64) -> TokenManager {
        TokenManager::new("test-secret-at-least-32-bytes-long!", Duration::seconds(duration_secs))
    }

    #[test]
    fn issue_verify_round_trip() {
        let manager = manager(60);
        let token = manager.issue("admin1", "admin").expect("issue should succeed");

        let claims = manager.verify(&token).expect("verify should succeed");
        assert_eq!(claims.sub, "admin1");
        assert_eq!(claims.role, "admin");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = manager(-60);
        let token = manager.issue("user1", "user").unwrap();

        assert!(matches!(manager.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let issuer = manager(60);
        let verifier =
            TokenManager::new("a-completely-different-shared-secret", Duration::seconds(60));

        let token = issuer.issue("user1", "user").unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let manager = manager(60);
        let token = manager.issue("user1", "user").unwrap();

        // Flip a character in the signature segment.
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert!(manager.verify(&tampered).is_err());
    }

    #[test]
    fn empty_role_is_malformed() {
        let manager = manager(60);
        let token = manager.issue("user1", "").unwrap();

        assert!(matches!(
            manager.verify(&token),
            Err(TokenError::MalformedClaims)
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let manager = manager(60);
        assert!(manager.verify("not-a-jwt").is_err());
    }
}
