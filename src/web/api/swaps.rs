//! Swap resolution endpoints.

use axum::extract::{Path, State};
use axum::Json;
use tracing::warn;
use uuid::Uuid;

use crate::core::token::SwapRequest;
use crate::web::auth::AuthSession;
use crate::web::error::ApiError;
use crate::web::AppState;

/// Points the proposer pays when their jump-ahead is accepted.
const REWARD_SWAP_COST: i64 = -10;
/// Points the accepter earns for giving up their spot.
const REWARD_SWAP_CREDIT: i64 = 5;

/// Accept a swap request targeting one of the caller's tokens.
pub async fn accept_swap(
    State(state): State<AppState>,
    session: AuthSession,
    Path(swap_id): Path<Uuid>,
) -> Result<Json<SwapRequest>, ApiError> {
    let user_id = session.require_user()?;
    let request = state.facade.accept_swap(swap_id, user_id)?;

    // Best effort: the exchange is already committed.
    credit_swap_rewards(&state, &request);
    Ok(Json(request))
}

/// Reject a swap request targeting one of the caller's tokens.
pub async fn reject_swap(
    State(state): State<AppState>,
    session: AuthSession,
    Path(swap_id): Path<Uuid>,
) -> Result<Json<SwapRequest>, ApiError> {
    let user_id = session.require_user()?;
    let request = state.facade.reject_swap(swap_id, user_id)?;
    Ok(Json(request))
}

fn credit_swap_rewards(state: &AppState, request: &SwapRequest) {
    match state.ledger.get_token(request.source_token) {
        Ok(token) => {
            if let Err(e) = state
                .directory
                .adjust_reward_points(token.user_id, REWARD_SWAP_COST)
            {
                warn!("Reward debit failed for user {}: {}", token.user_id, e);
            }
        }
        Err(e) => warn!("Reward debit skipped: {}", e),
    }
    match state.ledger.get_token(request.target_token) {
        Ok(token) => {
            if let Err(e) = state
                .directory
                .adjust_reward_points(token.user_id, REWARD_SWAP_CREDIT)
            {
                warn!("Reward credit failed for user {}: {}", token.user_id, e);
            }
        }
        Err(e) => warn!("Reward credit skipped: {}", e),
    }
}
