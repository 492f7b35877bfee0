//! Token booking, the user dashboard, and token lifecycle endpoints.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::core::facade::{
    ActionOutcome, IncomingSwapView, NeighborView, TokenAction, TokenOverview,
};
use crate::core::token::{SwapRequest, Token};
use crate::web::api::user_display_name;
use crate::web::auth::AuthSession;
use crate::web::error::ApiError;
use crate::web::AppState;

/// Points credited to a holder when their service completes.
const REWARD_SERVICE_COMPLETED: i64 = 10;

#[derive(Deserialize)]
pub struct BookRequest {
    pub queue_id: Uuid,
}

/// Book a place in a queue for the session's user.
pub async fn book_token(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<BookRequest>,
) -> Result<Json<Token>, ApiError> {
    let user_id = session.require_user()?;
    let token = state.facade.book(user_id, payload.queue_id)?;
    Ok(Json(token))
}

/// Outcome of a manage action: the updated token, or the swap request
/// now awaiting the target's answer.
#[derive(Serialize)]
#[serde(untagged)]
pub enum ManageResponse {
    Token(Token),
    Swap(SwapRequest),
}

impl From<ActionOutcome> for ManageResponse {
    fn from(outcome: ActionOutcome) -> Self {
        match outcome {
            ActionOutcome::Token(token) => ManageResponse::Token(token),
            ActionOutcome::Swap(request) => ManageResponse::Swap(request),
        }
    }
}

/// Apply a tagged action (CANCEL, SNOOZE, SWAP) to the caller's token.
pub async fn manage_token(
    State(state): State<AppState>,
    session: AuthSession,
    Path(token_id): Path<Uuid>,
    Json(action): Json<TokenAction>,
) -> Result<Json<ManageResponse>, ApiError> {
    let user_id = session.require_user()?;
    let outcome = state.facade.apply(token_id, user_id, action)?;
    Ok(Json(ManageResponse::from(outcome)))
}

/// Staff confirmation that the called holder was served.
pub async fn confirm_token(
    State(state): State<AppState>,
    session: AuthSession,
    Path(token_id): Path<Uuid>,
) -> Result<Json<Token>, ApiError> {
    let institution_id = session.require_institution()?;
    let token = state.controller.confirm(token_id, institution_id)?;

    // Best effort: the service transition is already committed.
    if let Err(e) = state
        .directory
        .adjust_reward_points(token.user_id, REWARD_SERVICE_COMPLETED)
    {
        warn!("Reward credit failed for user {}: {}", token.user_id, e);
    }
    Ok(Json(token))
}

/// Staff snooze: send a token to the back of its queue.
pub async fn snooze_token(
    State(state): State<AppState>,
    session: AuthSession,
    Path(token_id): Path<Uuid>,
) -> Result<Json<Token>, ApiError> {
    let institution_id = session.require_institution()?;
    let token = state.controller.snooze_by_staff(token_id, institution_id)?;
    Ok(Json(token))
}

#[derive(Serialize)]
pub struct NeighborEntry {
    pub token_id: Uuid,
    pub token_number: u32,
    pub holder_name: String,
    pub spots: u32,
    pub minutes_delta: u32,
}

#[derive(Serialize)]
pub struct IncomingEntry {
    pub swap_id: Uuid,
    pub source_token_number: u32,
    pub proposer_name: String,
    pub spots_behind: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct DashboardEntry {
    pub token: Token,
    pub queue_id: Uuid,
    pub queue_name: String,
    pub queue_closed: bool,
    pub institution_id: Uuid,
    pub institution_name: String,
    pub position: Option<u32>,
    pub current_serving: Option<u32>,
    pub estimated_wait_minutes: Option<u32>,
    pub swappable_ahead: Vec<NeighborEntry>,
    pub swappable_behind: Vec<NeighborEntry>,
    pub incoming_swaps: Vec<IncomingEntry>,
}

#[derive(Serialize)]
pub struct MeDashboard {
    pub reward_points: u32,
    pub tokens: Vec<DashboardEntry>,
}

/// The session user's dashboard: every live token with its position,
/// nearby swap candidates, and incoming requests.
pub async fn my_dashboard(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<MeDashboard>, ApiError> {
    let user_id = session.require_user()?;
    let reward_points = state
        .directory
        .get_user(user_id)?
        .map(|u| u.reward_points)
        .unwrap_or(0);

    let tokens = state
        .facade
        .dashboard(user_id)
        .into_iter()
        .map(|overview| dashboard_entry(&state, overview))
        .collect();

    Ok(Json(MeDashboard {
        reward_points,
        tokens,
    }))
}

fn dashboard_entry(state: &AppState, overview: TokenOverview) -> DashboardEntry {
    let institution_name = state
        .directory
        .get_institution(overview.institution_id)
        .ok()
        .flatten()
        .map(|i| i.name)
        .unwrap_or_else(|| "Unknown".to_string());

    let neighbor = |view: NeighborView| NeighborEntry {
        token_id: view.token_id,
        token_number: view.token_number,
        holder_name: user_display_name(&state.directory, view.user_id),
        spots: view.spots,
        minutes_delta: view.minutes_delta,
    };
    let incoming = |view: IncomingSwapView| IncomingEntry {
        swap_id: view.swap_id,
        source_token_number: view.source_token_number,
        proposer_name: user_display_name(&state.directory, view.source_user_id),
        spots_behind: view.spots_behind,
        reason: view.reason,
        created_at: view.created_at,
    };

    DashboardEntry {
        queue_id: overview.queue_id,
        queue_name: overview.queue_name,
        queue_closed: overview.queue_closed,
        institution_id: overview.institution_id,
        institution_name,
        position: overview.position,
        current_serving: overview.current_serving,
        estimated_wait_minutes: overview.estimated_wait_minutes,
        swappable_ahead: overview.swappable_ahead.into_iter().map(neighbor).collect(),
        swappable_behind: overview
            .swappable_behind
            .into_iter()
            .map(neighbor)
            .collect(),
        incoming_swaps: overview.incoming_swaps.into_iter().map(incoming).collect(),
        token: overview.token,
    }
}
