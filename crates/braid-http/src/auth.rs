//! Bearer-token resolution.
//!
//! The boundary only needs one thing from a token: the owner identity it
//! was issued for. [`TokenResolver`] captures that contract; the provided
//! [`JwtResolver`] validates HS512-signed JWTs whose subject carries the
//! numeric user id. Token issuance lives with the auth collaborator —
//! [`issue_token`] exists for operator tooling and tests.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use braid_types::OwnerId;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Errors from token validation or issuance.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token failed signature or expiry validation.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token's subject is not a numeric user id.
    #[error("malformed token subject")]
    MalformedSubject,
}

/// JWT claims carried by Braid bearer tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the numeric user id, as a string.
    pub sub: String,
    /// Expiry as unix seconds.
    pub exp: usize,
}

/// Turns a bearer token into an owner identity.
pub trait TokenResolver: Send + Sync {
    /// Validate `token` and return the identity it was issued for.
    fn resolve(&self, token: &str) -> Result<OwnerId, AuthError>;
}

/// HS512 JWT validator.
pub struct JwtResolver {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtResolver {
    /// Build a resolver for tokens signed with the given shared secret.
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS512),
        }
    }
}

impl TokenResolver for JwtResolver {
    fn resolve(&self, token: &str) -> Result<OwnerId, AuthError> {
        let data: TokenData<Claims> = decode(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let id: u64 = data
            .claims
            .sub
            .parse()
            .map_err(|_| AuthError::MalformedSubject)?;
        Ok(OwnerId::new(id))
    }
}

/// Issue a bearer token for `owner`, valid for `ttl`.
pub fn issue_token(secret: &str, owner: OwnerId, ttl: Duration) -> Result<String, AuthError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let claims = Claims {
        sub: owner.as_u64().to_string(),
        exp: (now + ttl.as_secs()) as usize,
    };
    encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}
