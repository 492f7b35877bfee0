//! Per-queue state and its exclusive critical section.
//!
//! Each queue's mutable state lives behind one `Mutex`. Every mutating
//! operation takes the lock for a single bounded transition; unrelated
//! queues never contend.

#![allow(dead_code)]

use crate::core::token::{
    InstitutionId, QueueId, SwapId, SwapRequest, Token, TokenId, TokenStatus, UserId,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Mutable state of a single queue. Only ever touched while holding the
/// owning cell's lock.
#[derive(Debug)]
pub struct QueueState {
    pub name: String,
    pub closed: bool,
    pub capacity: u32,
    /// Minutes of service per person, used for wait estimates.
    pub service_time_minutes: u32,
    /// Swap budget stamped onto every token booked into this queue.
    pub max_swaps_per_token: u32,
    /// Last number handed out. Numbers only ever move forward, so a
    /// terminal token's number is never reissued.
    last_number: u32,
    pub tokens: HashMap<TokenId, Token>,
    pub swaps: HashMap<SwapId, SwapRequest>,
    pub created_at: DateTime<Utc>,
}

impl QueueState {
    pub fn new(
        name: String,
        capacity: u32,
        service_time_minutes: u32,
        max_swaps_per_token: u32,
    ) -> Self {
        Self {
            name,
            closed: false,
            capacity,
            service_time_minutes,
            max_swaps_per_token,
            last_number: 0,
            tokens: HashMap::new(),
            swaps: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Hand out the next token number. Fetch-and-increment, starting at 1.
    pub fn allocate_number(&mut self) -> u32 {
        self.last_number += 1;
        self.last_number
    }

    /// Number of tokens counting against capacity (WAITING or CALLING).
    pub fn active_count(&self) -> usize {
        self.tokens.values().filter(|t| t.status.is_active()).count()
    }

    /// Whether the user already holds a non-terminal token here.
    pub fn has_active_token_for(&self, user_id: UserId) -> bool {
        self.tokens
            .values()
            .any(|t| t.user_id == user_id && t.status.is_active())
    }

    /// Rank of a WAITING token: 1 plus the count of waiting tokens with a
    /// smaller number. The front of the line is position 1.
    pub fn waiting_position(&self, token_number: u32) -> u32 {
        let ahead = self
            .tokens
            .values()
            .filter(|t| t.status == TokenStatus::Waiting && t.token_number < token_number)
            .count();
        ahead as u32 + 1
    }

    /// The single CALLING token, if the service point is occupied.
    pub fn calling_token(&self) -> Option<&Token> {
        self.tokens.values().find(|t| t.status == TokenStatus::Calling)
    }

    /// The WAITING token with the smallest number.
    pub fn next_waiting(&self) -> Option<TokenId> {
        self.tokens
            .values()
            .filter(|t| t.status == TokenStatus::Waiting)
            .min_by_key(|t| t.token_number)
            .map(|t| t.id)
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(&id)
    }

    pub fn token_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.get_mut(&id)
    }

    pub fn swap(&self, id: SwapId) -> Option<&SwapRequest> {
        self.swaps.get(&id)
    }

    pub fn swap_mut(&mut self, id: SwapId) -> Option<&mut SwapRequest> {
        self.swaps.get_mut(&id)
    }
}

/// A queue's identity plus its guarded state. Identity fields are
/// immutable, so they may be read without taking the lock.
#[derive(Debug)]
pub struct QueueCell {
    pub id: QueueId,
    pub institution_id: InstitutionId,
    state: Mutex<QueueState>,
}

impl QueueCell {
    pub fn new(institution_id: InstitutionId, state: QueueState) -> Self {
        Self {
            id: Uuid::new_v4(),
            institution_id,
            state: Mutex::new(state),
        }
    }

    /// Enter the queue's critical section.
    pub fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap()
    }

    /// Clone a consistent snapshot for read models. Takes the lock only
    /// for the duration of the clone.
    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.lock();
        QueueSnapshot {
            id: self.id,
            institution_id: self.institution_id,
            name: state.name.clone(),
            closed: state.closed,
            capacity: state.capacity,
            service_time_minutes: state.service_time_minutes,
            max_swaps_per_token: state.max_swaps_per_token,
            tokens: state.tokens.values().cloned().collect(),
            swaps: state.swaps.values().cloned().collect(),
            created_at: state.created_at,
        }
    }
}

/// Point-in-time copy of a queue, safe to inspect without holding any lock.
/// Staleness is bounded by the caller's polling interval; snapshots are
/// never used to decide mutations.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub id: QueueId,
    pub institution_id: InstitutionId,
    pub name: String,
    pub closed: bool,
    pub capacity: u32,
    pub service_time_minutes: u32,
    pub max_swaps_per_token: u32,
    pub tokens: Vec<Token>,
    pub swaps: Vec<SwapRequest>,
    pub created_at: DateTime<Utc>,
}

impl QueueSnapshot {
    /// Same ranking rule as the live state, computed over the snapshot.
    pub fn waiting_position(&self, token_number: u32) -> u32 {
        let ahead = self
            .tokens
            .iter()
            .filter(|t| t.status == TokenStatus::Waiting && t.token_number < token_number)
            .count();
        ahead as u32 + 1
    }

    /// Number currently at the service point, if any.
    pub fn current_serving(&self) -> Option<u32> {
        self.tokens
            .iter()
            .find(|t| t.status == TokenStatus::Calling)
            .map(|t| t.token_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> QueueState {
        QueueState::new("Pharmacy".to_string(), 50, 5, 8)
    }

    fn add_token(state: &mut QueueState, user: UserId) -> TokenId {
        let number = state.allocate_number();
        let token = Token::new(Uuid::new_v4(), user, number, state.max_swaps_per_token);
        let id = token.id;
        state.tokens.insert(id, token);
        id
    }

    #[test]
    fn test_numbers_start_at_one_and_increase() {
        let mut state = state();
        assert_eq!(state.allocate_number(), 1);
        assert_eq!(state.allocate_number(), 2);
        assert_eq!(state.allocate_number(), 3);
    }

    #[test]
    fn test_waiting_position_is_one_based_rank() {
        let mut state = state();
        let a = add_token(&mut state, Uuid::new_v4());
        let _b = add_token(&mut state, Uuid::new_v4());
        let _c = add_token(&mut state, Uuid::new_v4());

        assert_eq!(state.waiting_position(1), 1);
        assert_eq!(state.waiting_position(2), 2);
        assert_eq!(state.waiting_position(3), 3);

        // Front token leaves the waiting set; ranks shift up.
        state.token_mut(a).unwrap().status = TokenStatus::Calling;
        assert_eq!(state.waiting_position(2), 1);
        assert_eq!(state.waiting_position(3), 2);
    }

    #[test]
    fn test_rank_tolerates_number_gaps() {
        let mut state = state();
        let a = add_token(&mut state, Uuid::new_v4());
        let _b = add_token(&mut state, Uuid::new_v4());
        let _c = add_token(&mut state, Uuid::new_v4());

        // Cancelling the front token leaves a gap at number 1.
        state.token_mut(a).unwrap().status = TokenStatus::Cancelled;
        assert_eq!(state.waiting_position(2), 1);
        assert_eq!(state.waiting_position(3), 2);
        assert_eq!(state.active_count(), 2);
    }

    #[test]
    fn test_next_waiting_picks_smallest_number() {
        let mut state = state();
        let a = add_token(&mut state, Uuid::new_v4());
        let b = add_token(&mut state, Uuid::new_v4());

        assert_eq!(state.next_waiting(), Some(a));
        state.token_mut(a).unwrap().status = TokenStatus::Completed;
        assert_eq!(state.next_waiting(), Some(b));
        state.token_mut(b).unwrap().status = TokenStatus::Cancelled;
        assert_eq!(state.next_waiting(), None);
    }

    #[test]
    fn test_calling_token_lookup() {
        let mut state = state();
        let a = add_token(&mut state, Uuid::new_v4());
        assert!(state.calling_token().is_none());
        state.token_mut(a).unwrap().status = TokenStatus::Calling;
        assert_eq!(state.calling_token().unwrap().id, a);
    }

    #[test]
    fn test_has_active_token_for_ignores_terminal() {
        let mut state = state();
        let user = Uuid::new_v4();
        let a = add_token(&mut state, user);
        assert!(state.has_active_token_for(user));
        state.token_mut(a).unwrap().status = TokenStatus::Cancelled;
        assert!(!state.has_active_token_for(user));
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut state = state();
        let _a = add_token(&mut state, Uuid::new_v4());
        let b = add_token(&mut state, Uuid::new_v4());
        state.token_mut(b).unwrap().status = TokenStatus::Calling;

        let cell = QueueCell::new(Uuid::new_v4(), state);
        let snap = cell.snapshot();
        assert_eq!(snap.tokens.len(), 2);
        assert_eq!(snap.current_serving(), Some(2));
        assert_eq!(snap.waiting_position(1), 1);
    }
}
