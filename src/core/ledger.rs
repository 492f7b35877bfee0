//! Token ledger: booking, ordering, and lifecycle of tokens.
//!
//! Every mutation here is one atomic transition under the owning queue's
//! lock. Lookups addressed by token id go through `token_index` so no
//! operation ever scans across queues.

#![allow(dead_code)]

use crate::core::queue::QueueCell;
use crate::core::registry::QueueRegistry;
use crate::core::token::{QueueId, Token, TokenId, TokenStatus, UserId};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct TokenLedger {
    registry: Arc<QueueRegistry>,
    /// Token id to owning queue id. Entries are never removed; terminal
    /// tokens stay resolvable for history views.
    token_index: DashMap<TokenId, QueueId>,
    /// User id to the tokens they have held, in booking order.
    user_tokens: DashMap<UserId, Vec<TokenId>>,
}

impl TokenLedger {
    pub fn new(registry: Arc<QueueRegistry>) -> Self {
        Self {
            registry,
            token_index: DashMap::new(),
            user_tokens: DashMap::new(),
        }
    }

    /// Book a place in a queue. The token number comes from the queue's
    /// fetch-and-increment counter, so numbers are unique and never reused.
    pub fn book_token(&self, queue_id: QueueId, user_id: UserId) -> Result<Token> {
        let cell = self.registry.get(queue_id)?;
        let token = {
            let mut state = cell.lock();
            if state.closed {
                return Err(Error::QueueClosed);
            }
            if state.has_active_token_for(user_id) {
                return Err(Error::AlreadyBooked);
            }
            if state.active_count() as u32 >= state.capacity {
                return Err(Error::QueueFull);
            }
            let number = state.allocate_number();
            let token = Token::new(cell.id, user_id, number, state.max_swaps_per_token);
            state.tokens.insert(token.id, token.clone());
            token
        };

        self.token_index.insert(token.id, queue_id);
        self.user_tokens.entry(user_id).or_default().push(token.id);

        info!(
            "Booked token #{} in queue {} for user {}",
            token.token_number, queue_id, user_id
        );
        Ok(token)
    }

    /// Resolve the queue cell a token lives in.
    pub fn queue_of(&self, token_id: TokenId) -> Result<Arc<QueueCell>> {
        let queue_id = self
            .token_index
            .get(&token_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| Error::NotFound(format!("token {}", token_id)))?;
        self.registry.get(queue_id)
    }

    /// Fetch a token by id.
    pub fn get_token(&self, token_id: TokenId) -> Result<Token> {
        let cell = self.queue_of(token_id)?;
        let state = cell.lock();
        state
            .token(token_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("token {}", token_id)))
    }

    /// Rank of a WAITING token among the queue's waiting tokens (1 = front).
    pub fn compute_position(&self, token_id: TokenId) -> Result<u32> {
        let cell = self.queue_of(token_id)?;
        let state = cell.lock();
        let token = state
            .token(token_id)
            .ok_or_else(|| Error::NotFound(format!("token {}", token_id)))?;
        if token.status != TokenStatus::Waiting {
            return Err(Error::TokenNotWaiting(token.status.to_string()));
        }
        Ok(state.waiting_position(token.token_number))
    }

    /// Move a token to the back of its queue. Allowed from WAITING and
    /// CALLING; the new number comes from the counter, so it lands behind
    /// every number ever issued. Resulting status is always WAITING.
    pub fn reassign_to_back(&self, token_id: TokenId) -> Result<Token> {
        let cell = self.queue_of(token_id)?;
        let mut state = cell.lock();
        let current = state
            .token(token_id)
            .ok_or_else(|| Error::NotFound(format!("token {}", token_id)))?;
        if current.status.is_terminal() {
            return Err(Error::TokenTerminal(current.status.to_string()));
        }
        let number = state.allocate_number();
        let token = state.token_mut(token_id).ok_or_else(|| {
            Error::NotFound(format!("token {}", token_id))
        })?;
        token.token_number = number;
        token.status = TokenStatus::Waiting;
        token.called_at = None;
        let token = token.clone();

        debug!("Token {} moved to back as #{}", token_id, number);
        Ok(token)
    }

    /// Cancel a token. Requires WAITING or CALLING; terminal tokens are
    /// immutable. Numbers are never reassigned, the gap is tolerated.
    pub fn cancel(&self, token_id: TokenId) -> Result<Token> {
        let cell = self.queue_of(token_id)?;
        let mut state = cell.lock();
        let token = state
            .token_mut(token_id)
            .ok_or_else(|| Error::NotFound(format!("token {}", token_id)))?;
        if token.status.is_terminal() {
            return Err(Error::TokenTerminal(token.status.to_string()));
        }
        token.status = TokenStatus::Cancelled;
        let token = token.clone();

        info!("Cancelled token {} (#{})", token_id, token.token_number);
        Ok(token)
    }

    /// Every token a user has held, in booking order.
    pub fn tokens_for_user(&self, user_id: UserId) -> Vec<Token> {
        let ids: Vec<TokenId> = self
            .user_tokens
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        ids.into_iter()
            .filter_map(|id| self.get_token(id).ok())
            .collect()
    }
}
