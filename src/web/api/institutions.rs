//! Institution discovery and the staff dashboard.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::token::TokenStatus;
use crate::web::api::queues::QueueSummary;
use crate::web::api::user_display_name;
use crate::web::auth::AuthSession;
use crate::web::error::ApiError;
use crate::web::AppState;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
}

/// Directory entry with the institution's live queues nested in.
#[derive(Serialize)]
pub struct InstitutionEntry {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub queues: Vec<QueueSummary>,
}

/// Search institutions by name or address. An empty term lists all.
pub async fn list_institutions(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<InstitutionEntry>>, ApiError> {
    let records = state.directory.search_institutions(&params.search)?;
    let entries = records
        .into_iter()
        .map(|record| {
            let queues = state
                .registry
                .snapshots_for(record.id)
                .iter()
                .map(QueueSummary::from)
                .collect();
            InstitutionEntry {
                id: record.id,
                name: record.name,
                phone: record.phone,
                address: record.address,
                queues,
            }
        })
        .collect();
    Ok(Json(entries))
}

/// One token as staff see it in the dashboard.
#[derive(Serialize)]
pub struct StaffTokenView {
    pub id: Uuid,
    pub token_number: u32,
    pub status: TokenStatus,
    pub holder_name: String,
    pub swaps_used: u32,
    pub max_swaps: u32,
    pub joined_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
}

/// A queue with its live line, ascending by token number.
#[derive(Serialize)]
pub struct StaffQueueView {
    #[serde(flatten)]
    pub summary: QueueSummary,
    pub tokens: Vec<StaffTokenView>,
}

/// Staff dashboard: every queue the institution owns, with the current
/// line. Sessions may only view their own institution.
pub async fn institution_dashboard(
    State(state): State<AppState>,
    session: AuthSession,
    Path(institution_id): Path<Uuid>,
) -> Result<Json<Vec<StaffQueueView>>, ApiError> {
    let session_id = session.require_institution()?;
    if session_id != institution_id {
        return Err(ApiError::Forbidden(
            "cannot view another institution's dashboard".to_string(),
        ));
    }

    let views = state
        .registry
        .snapshots_for(institution_id)
        .iter()
        .map(|snap| {
            let mut active: Vec<_> = snap
                .tokens
                .iter()
                .filter(|t| t.status.is_active())
                .collect();
            active.sort_by_key(|t| t.token_number);
            let tokens = active
                .into_iter()
                .map(|t| StaffTokenView {
                    id: t.id,
                    token_number: t.token_number,
                    status: t.status,
                    holder_name: user_display_name(&state.directory, t.user_id),
                    swaps_used: t.swaps_used,
                    max_swaps: t.max_swaps,
                    joined_at: t.joined_at,
                    called_at: t.called_at,
                })
                .collect();
            StaffQueueView {
                summary: QueueSummary::from(snap),
                tokens,
            }
        })
        .collect();

    Ok(Json(views))
}
