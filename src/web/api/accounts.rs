//! Signup and login endpoints.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::web::auth::{generate_token, hash_password, verify_password, Role};
use crate::web::error::ApiError;
use crate::web::AppState;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub role: Role,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub role: Role,
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_points: Option<u32>,
}

/// Register a user or institution account.
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    if payload.password.len() < 6 {
        return Err(ApiError::BadRequest(
            "password must be at least 6 characters".to_string(),
        ));
    }
    let hash = hash_password(&payload.password).map_err(ApiError::Internal)?;

    let response = match payload.role {
        Role::User => {
            let user = state
                .directory
                .create_user(&payload.name, &payload.email, &hash)?;
            AccountResponse {
                id: user.id,
                role: Role::User,
                name: user.name,
                email: user.email,
                reward_points: Some(user.reward_points),
                phone: None,
                address: None,
            }
        }
        Role::Institution => {
            let institution = state.directory.create_institution(
                &payload.name,
                &payload.email,
                payload.phone.as_deref(),
                payload.address.as_deref(),
                &hash,
            )?;
            AccountResponse {
                id: institution.id,
                role: Role::Institution,
                name: institution.name,
                email: institution.email,
                reward_points: None,
                phone: institution.phone,
                address: institution.address,
            }
        }
    };

    info!("New {} account: {}", response.role, response.email);
    Ok(Json(response))
}

/// Exchange credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let invalid = || ApiError::Unauthorized("invalid credentials".to_string());

    let response = match payload.role {
        Role::User => {
            let user = state
                .directory
                .find_user_by_email(&payload.email)?
                .ok_or_else(invalid)?;
            if !verify_password(&payload.password, &user.password_hash)
                .map_err(ApiError::Internal)?
            {
                return Err(invalid());
            }
            let token = generate_token(
                state.jwt_secret(),
                state.token_ttl(),
                &user.id.to_string(),
                &user.name,
                Role::User,
            )
            .map_err(ApiError::Internal)?;
            LoginResponse {
                token,
                id: user.id,
                role: Role::User,
                name: user.name,
                email: user.email,
                reward_points: Some(user.reward_points),
            }
        }
        Role::Institution => {
            let institution = state
                .directory
                .find_institution_by_email(&payload.email)?
                .ok_or_else(invalid)?;
            if !verify_password(&payload.password, &institution.password_hash)
                .map_err(ApiError::Internal)?
            {
                return Err(invalid());
            }
            let token = generate_token(
                state.jwt_secret(),
                state.token_ttl(),
                &institution.id.to_string(),
                &institution.name,
                Role::Institution,
            )
            .map_err(ApiError::Internal)?;
            LoginResponse {
                token,
                id: institution.id,
                role: Role::Institution,
                name: institution.name,
                email: institution.email,
                reward_points: None,
            }
        }
    };

    info!("Login: {} ({})", response.email, response.role);
    Ok(Json(response))
}
