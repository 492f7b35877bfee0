//! JWT sessions and password hashing for the web API.
#![allow(dead_code)]

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::web::error::ApiError;
use crate::web::AppState;

/// Fallback JWT secret (override in settings for production).
pub const DEFAULT_JWT_SECRET: &[u8] = b"waitless-secret-key-change-in-production";

/// Who a session speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A person holding tokens
    User,
    /// Staff of an institution operating queues
    Institution,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Institution => write!(f, "institution"),
        }
    }
}

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (account ID)
    pub name: String, // Display name
    pub role: Role,   // Session role
    pub exp: usize,   // Expiration time
    pub iat: usize,   // Issued at
}

/// Generate a session token.
pub fn generate_token(
    secret: &[u8],
    ttl_secs: u64,
    account_id: &str,
    name: &str,
    role: Role,
) -> Result<String, String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| e.to_string())?
        .as_secs() as usize;

    let claims = Claims {
        sub: account_id.to_string(),
        name: name.to_string(),
        role,
        exp: now + ttl_secs as usize,
        iat: now,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
        .map_err(|e| e.to_string())
}

/// Validate a session token.
pub fn validate_token(secret: &[u8], token: &str) -> Result<Claims, String> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| e.to_string())?;

    Ok(token_data.claims)
}

/// Extract the bearer token from an Authorization header.
pub fn extract_token(auth_header: Option<&str>) -> Result<&str, String> {
    let header = auth_header.ok_or("Missing Authorization header")?;

    if !header.starts_with("Bearer ") {
        return Err("Invalid Authorization header format".to_string());
    }

    Ok(&header[7..])
}

/// Hash a password.
pub fn hash_password(password: &str) -> Result<String, String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| e.to_string())
}

/// Verify a password.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    bcrypt::verify(password, hash).map_err(|e| e.to_string())
}

/// An authenticated session, extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl AuthSession {
    /// The account id, insisting on a user session.
    pub fn require_user(&self) -> Result<Uuid, ApiError> {
        match self.role {
            Role::User => Ok(self.id),
            Role::Institution => Err(ApiError::Forbidden(
                "requires a user session".to_string(),
            )),
        }
    }

    /// The account id, insisting on an institution session.
    pub fn require_institution(&self) -> Result<Uuid, ApiError> {
        match self.role {
            Role::Institution => Ok(self.id),
            Role::User => Err(ApiError::Forbidden(
                "requires an institution session".to_string(),
            )),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = extract_token(header).map_err(ApiError::Unauthorized)?;
        let claims = validate_token(state.jwt_secret(), token)
            .map_err(|_| ApiError::Unauthorized("invalid or expired session".to_string()))?;
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("invalid session subject".to_string()))?;

        Ok(AuthSession {
            id,
            name: claims.name,
            role: claims.role,
        })
    }
}
