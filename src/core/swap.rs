//! Swap negotiation: proposing, accepting, and rejecting position exchanges.
//!
//! Requests live inside the queue's guarded state, so resolving one
//! serializes with every other mutation of the same queue. Acceptance
//! exchanges exactly the two token numbers; the rest of the queue is
//! untouched.

#![allow(dead_code)]

use crate::core::ledger::TokenLedger;
use crate::core::registry::QueueRegistry;
use crate::core::token::{QueueId, SwapId, SwapRequest, SwapStatus, TokenId, TokenStatus};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SwapNegotiator {
    registry: Arc<QueueRegistry>,
    ledger: Arc<TokenLedger>,
    /// Swap id to queue id, so accept/reject find the right lock.
    swap_index: DashMap<SwapId, QueueId>,
}

impl SwapNegotiator {
    pub fn new(registry: Arc<QueueRegistry>, ledger: Arc<TokenLedger>) -> Self {
        Self {
            registry,
            ledger,
            swap_index: DashMap::new(),
        }
    }

    /// Propose exchanging numbers with another waiting token in the same
    /// queue. Consumes no quota yet; only acceptance does.
    pub fn propose(
        &self,
        source_token: TokenId,
        target_token: TokenId,
        reason: Option<String>,
    ) -> Result<SwapRequest> {
        if source_token == target_token {
            return Err(Error::InvalidTarget(
                "a token cannot swap with itself".to_string(),
            ));
        }

        let cell = self.ledger.queue_of(source_token)?;
        let request = {
            let mut state = cell.lock();
            let source = state
                .token(source_token)
                .ok_or_else(|| Error::NotFound(format!("token {}", source_token)))?;
            if source.status != TokenStatus::Waiting {
                return Err(Error::TokenNotWaiting(source.status.to_string()));
            }
            if !source.has_swap_budget() {
                return Err(Error::SwapQuotaExceeded);
            }
            let target = state.token(target_token).ok_or_else(|| {
                Error::InvalidTarget("target token is not in this queue".to_string())
            })?;
            if target.status != TokenStatus::Waiting {
                return Err(Error::TokenNotWaiting(target.status.to_string()));
            }

            let request = SwapRequest::new(cell.id, source_token, target_token, reason);
            state.swaps.insert(request.id, request.clone());
            request
        };

        self.swap_index.insert(request.id, cell.id);
        debug!(
            "Swap {} proposed: token {} -> token {}",
            request.id, source_token, target_token
        );
        Ok(request)
    }

    /// Accept a pending request. Atomic under the queue lock: exchanges the
    /// two numbers, charges one swap to each side, and supersedes every
    /// other pending request touching either token.
    pub fn accept(&self, swap_id: SwapId) -> Result<SwapRequest> {
        let cell = self.cell_of(swap_id)?;
        let mut state = cell.lock();

        let request = state
            .swap(swap_id)
            .ok_or_else(|| Error::NotFound(format!("swap {}", swap_id)))?;
        if request.status.is_resolved() {
            return Err(Error::SwapAlreadyResolved);
        }
        let source_id = request.source_token;
        let target_id = request.target_token;

        let source = state
            .token(source_id)
            .ok_or_else(|| Error::NotFound(format!("token {}", source_id)))?;
        let target = state
            .token(target_id)
            .ok_or_else(|| Error::NotFound(format!("token {}", target_id)))?;
        if source.status != TokenStatus::Waiting || target.status != TokenStatus::Waiting {
            return Err(Error::TokenStateChanged);
        }
        if !source.has_swap_budget() || !target.has_swap_budget() {
            return Err(Error::SwapQuotaExceeded);
        }
        let source_number = source.token_number;
        let target_number = target.token_number;

        // Commit point. Everything below must succeed, and does: both
        // tokens were just read under this same lock.
        if let Some(token) = state.token_mut(source_id) {
            token.token_number = target_number;
            token.swaps_used += 1;
        }
        if let Some(token) = state.token_mut(target_id) {
            token.token_number = source_number;
            token.swaps_used += 1;
        }
        for other in state.swaps.values_mut() {
            if other.id != swap_id
                && other.status == SwapStatus::Pending
                && (other.touches(source_id) || other.touches(target_id))
            {
                other.status = SwapStatus::Superseded;
            }
        }
        let request = state
            .swap_mut(swap_id)
            .ok_or_else(|| Error::NotFound(format!("swap {}", swap_id)))?;
        request.status = SwapStatus::Accepted;
        let request = request.clone();

        info!(
            "Swap {} accepted: #{} <-> #{}",
            swap_id, source_number, target_number
        );
        Ok(request)
    }

    /// Reject a pending request. No ledger mutation.
    pub fn reject(&self, swap_id: SwapId) -> Result<SwapRequest> {
        let cell = self.cell_of(swap_id)?;
        let mut state = cell.lock();

        let request = state
            .swap_mut(swap_id)
            .ok_or_else(|| Error::NotFound(format!("swap {}", swap_id)))?;
        if request.status.is_resolved() {
            return Err(Error::SwapAlreadyResolved);
        }
        request.status = SwapStatus::Rejected;
        let request = request.clone();

        info!("Swap {} rejected", swap_id);
        Ok(request)
    }

    /// Fetch a request by id.
    pub fn get_swap(&self, swap_id: SwapId) -> Result<SwapRequest> {
        let cell = self.cell_of(swap_id)?;
        let state = cell.lock();
        state
            .swap(swap_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("swap {}", swap_id)))
    }

    fn cell_of(&self, swap_id: SwapId) -> Result<Arc<crate::core::queue::QueueCell>> {
        let queue_id = self
            .swap_index
            .get(&swap_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| Error::NotFound(format!("swap {}", swap_id)))?;
        self.registry.get(queue_id)
    }
}
