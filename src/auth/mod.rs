use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::AuthConfig;

/// Subject details decoded from a bearer credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub username: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token is missing claim '{0}'")]
    MissingClaim(String),
    #[error("token lacks required scope '{0}'")]
    MissingScope(String),
    #[error("authenticator unavailable: {0}")]
    Unavailable(String),
    #[error("token lifetime of {0} hours is out of range")]
    InvalidLifetime(i64),
}

/// Turns a bearer credential into identity claims.
///
/// Implementations own their deadlines; callers apply no timeout of their own.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credential: &str, scopes: &[String]) -> Result<IdentityClaims, AuthError>;
}

/// HS256 JWT authenticator with configurable claim names
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
    username_claim: String,
    email_claim: String,
    name_claim: String,
}

impl JwtAuthenticator {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        if config.jwt_secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }

        Ok(Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation: Validation::default(),
            username_claim: config.username_claim.clone(),
            email_claim: config.email_claim.clone(),
            name_claim: config.name_claim.clone(),
        })
    }

    fn claim(claims: &Map<String, Value>, name: &str) -> Option<String> {
        claims
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, credential: &str, scopes: &[String]) -> Result<IdentityClaims, AuthError> {
        let token_data = decode::<Map<String, Value>>(credential, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let claims = token_data.claims;

        if !scopes.is_empty() {
            let granted = Self::claim(&claims, "scope").unwrap_or_default();
            let granted: Vec<&str> = granted.split(' ').collect();
            if let Some(missing) = scopes.iter().find(|s| !granted.contains(&s.as_str())) {
                return Err(AuthError::MissingScope(missing.clone()));
            }
        }

        let username = Self::claim(&claims, &self.username_claim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AuthError::MissingClaim(self.username_claim.clone()))?;

        // Email and display name are informational; absent values become empty
        Ok(IdentityClaims {
            username,
            email: Self::claim(&claims, &self.email_claim).unwrap_or_default(),
            name: Self::claim(&claims, &self.name_claim).unwrap_or_default(),
        })
    }
}

/// Issue an HS256 token for the given claims, valid for `ttl_hours`.
///
/// Used by the `token` command for local development and by tests.
pub fn issue_token(config: &AuthConfig, claims: &IdentityClaims, ttl_hours: i64) -> Result<String, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let now = Utc::now();
    let expires_at = Duration::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or(AuthError::InvalidLifetime(ttl_hours))?;

    let mut payload = Map::new();
    payload.insert(config.username_claim.clone(), Value::from(claims.username.clone()));
    payload.insert(config.email_claim.clone(), Value::from(claims.email.clone()));
    payload.insert(config.name_claim.clone(), Value::from(claims.name.clone()));
    payload.insert("iat".into(), Value::from(now.timestamp()));
    payload.insert("exp".into(), Value::from(expires_at.timestamp()));

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), &payload, &encoding_key)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}
