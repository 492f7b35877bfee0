//! Queue management endpoints for institution staff.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::queue::QueueSnapshot;
use crate::core::token::Token;
use crate::web::auth::AuthSession;
use crate::web::error::ApiError;
use crate::web::AppState;

/// Queue as shown in listings and management responses. Never includes
/// the token set; dashboards expose that separately.
#[derive(Serialize)]
pub struct QueueSummary {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub name: String,
    pub closed: bool,
    pub capacity: u32,
    pub service_time_minutes: u32,
    pub max_swaps_per_token: u32,
    pub active_count: usize,
    pub current_serving: Option<u32>,
}

impl From<&QueueSnapshot> for QueueSummary {
    fn from(snap: &QueueSnapshot) -> Self {
        Self {
            id: snap.id,
            institution_id: snap.institution_id,
            name: snap.name.clone(),
            closed: snap.closed,
            capacity: snap.capacity,
            service_time_minutes: snap.service_time_minutes,
            max_swaps_per_token: snap.max_swaps_per_token,
            active_count: snap.tokens.iter().filter(|t| t.status.is_active()).count(),
            current_serving: snap.current_serving(),
        }
    }
}

#[derive(Deserialize)]
pub struct CreateQueueRequest {
    pub name: String,
    pub capacity: u32,
    pub service_time_minutes: u32,
    /// Swap budget per token; falls back to the configured default.
    #[serde(default)]
    pub max_swaps: Option<u32>,
}

/// Open a new queue owned by the session's institution.
pub async fn create_queue(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<CreateQueueRequest>,
) -> Result<Json<QueueSummary>, ApiError> {
    let institution_id = session.require_institution()?;
    let max_swaps = payload
        .max_swaps
        .unwrap_or(state.settings.defaults.max_swaps_per_token);
    let snap = state.registry.create_queue(
        institution_id,
        &payload.name,
        payload.capacity,
        payload.service_time_minutes,
        max_swaps,
    )?;
    Ok(Json(QueueSummary::from(&snap)))
}

/// Close a queue to new bookings. Tokens already in line are unaffected.
pub async fn close_queue(
    State(state): State<AppState>,
    session: AuthSession,
    Path(queue_id): Path<Uuid>,
) -> Result<Json<QueueSummary>, ApiError> {
    let institution_id = session.require_institution()?;
    let snap = state.registry.close_queue(institution_id, queue_id)?;
    Ok(Json(QueueSummary::from(&snap)))
}

/// Call the front waiting token to the service point.
pub async fn call_next(
    State(state): State<AppState>,
    session: AuthSession,
    Path(queue_id): Path<Uuid>,
) -> Result<Json<Token>, ApiError> {
    let institution_id = session.require_institution()?;
    let token = state.controller.call_next(queue_id, institution_id)?;
    Ok(Json(token))
}
