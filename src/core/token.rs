//! Core domain types: tokens and swap requests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier aliases. Everything is a v4 UUID under the hood; the aliases
/// keep signatures honest about which kind of id they expect.
pub type TokenId = Uuid;
pub type QueueId = Uuid;
pub type UserId = Uuid;
pub type InstitutionId = Uuid;
pub type SwapId = Uuid;

/// Lifecycle states of a queue token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    /// Holding a place in line
    Waiting,
    /// Called to the service point, awaiting confirmation
    Calling,
    /// Service finished
    Completed,
    /// Withdrawn by the holder or staff
    Cancelled,
}

impl TokenStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TokenStatus::Completed | TokenStatus::Cancelled)
    }

    /// Active tokens occupy a seat against the queue's capacity.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TokenStatus::Waiting => "WAITING",
            TokenStatus::Calling => "CALLING",
            TokenStatus::Completed => "COMPLETED",
            TokenStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle states of a swap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapStatus {
    /// Awaiting a decision from the target
    Pending,
    /// Target agreed; positions were exchanged
    Accepted,
    /// Target declined
    Rejected,
    /// Invalidated because one of the tokens changed hands or state
    Superseded,
}

impl SwapStatus {
    /// A resolved request can never become pending again.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, SwapStatus::Pending)
    }
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SwapStatus::Pending => "PENDING",
            SwapStatus::Accepted => "ACCEPTED",
            SwapStatus::Rejected => "REJECTED",
            SwapStatus::Superseded => "SUPERSEDED",
        };
        write!(f, "{}", s)
    }
}

/// A numbered place in a queue held by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub queue_id: QueueId,
    pub user_id: UserId,
    /// Number within the queue. Allocated monotonically, never reused.
    pub token_number: u32,
    pub status: TokenStatus,
    /// Accepted swaps this token has taken part in.
    pub swaps_used: u32,
    /// Swap budget. `swaps_used` never exceeds this.
    pub max_swaps: u32,
    pub joined_at: DateTime<Utc>,
    /// Set when the token is called to the front, cleared on snooze.
    pub called_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Create a fresh waiting token.
    pub fn new(queue_id: QueueId, user_id: UserId, token_number: u32, max_swaps: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue_id,
            user_id,
            token_number,
            status: TokenStatus::Waiting,
            swaps_used: 0,
            max_swaps,
            joined_at: Utc::now(),
            called_at: None,
        }
    }

    /// Whether this token may take part in one more swap.
    pub fn has_swap_budget(&self) -> bool {
        self.swaps_used < self.max_swaps
    }
}

/// A proposal to exchange numbers between two tokens in the same queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub id: SwapId,
    pub queue_id: QueueId,
    /// Token of the proposing user.
    pub source_token: TokenId,
    /// Token of the user being asked.
    pub target_token: TokenId,
    pub status: SwapStatus,
    /// Optional note shown to the target.
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SwapRequest {
    /// Create a pending request.
    pub fn new(
        queue_id: QueueId,
        source_token: TokenId,
        target_token: TokenId,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue_id,
            source_token,
            target_token,
            status: SwapStatus::Pending,
            reason,
            created_at: Utc::now(),
        }
    }

    /// Whether the request involves the given token on either side.
    pub fn touches(&self, token: TokenId) -> bool {
        self.source_token == token || self.target_token == token
    }
}
