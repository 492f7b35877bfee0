//! User-side orchestration: self-service token actions and the
//! per-user dashboard read model.
//!
//! Every mutation is scoped to the token's owner before it is applied.
//! Dashboards are assembled from per-queue snapshots; they are read-only
//! projections and never feed back into mutation decisions.

#![allow(dead_code)]

use crate::core::ledger::TokenLedger;
use crate::core::swap::SwapNegotiator;
use crate::core::token::{
    InstitutionId, QueueId, SwapId, SwapRequest, SwapStatus, Token, TokenId, TokenStatus, UserId,
};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One token-management action. The tag makes invalid action/payload
/// combinations unrepresentable at the boundary instead of a runtime
/// string switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenAction {
    /// Give up the place entirely
    Cancel,
    /// Step to the back of the line
    Snooze,
    /// Ask another holder to exchange numbers
    Swap {
        target_token_id: TokenId,
        #[serde(default)]
        reason: Option<String>,
    },
}

/// What a manage action produced: the updated token, or the swap request
/// now awaiting the target's answer.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Token(Token),
    Swap(SwapRequest),
}

/// One nearby waiting token the viewer could negotiate with.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborView {
    pub token_id: TokenId,
    pub user_id: UserId,
    pub token_number: u32,
    /// Rank distance from the viewer's token.
    pub spots: u32,
    /// Wait-time difference implied by the rank distance.
    pub minutes_delta: u32,
}

/// A pending swap request against one of the viewer's tokens.
#[derive(Debug, Clone, Serialize)]
pub struct IncomingSwapView {
    pub swap_id: SwapId,
    pub source_token_id: TokenId,
    pub source_user_id: UserId,
    pub source_token_number: u32,
    /// Rank distance of the proposer, positive when they stand behind
    /// the viewer.
    pub spots_behind: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Dashboard line for one of the user's tokens.
#[derive(Debug, Clone, Serialize)]
pub struct TokenOverview {
    pub token: Token,
    pub queue_id: QueueId,
    pub institution_id: InstitutionId,
    pub queue_name: String,
    pub queue_closed: bool,
    pub service_time_minutes: u32,
    /// Rank among waiting tokens; only present while WAITING.
    pub position: Option<u32>,
    /// Number currently at the service point, if any.
    pub current_serving: Option<u32>,
    pub estimated_wait_minutes: Option<u32>,
    pub swappable_ahead: Vec<NeighborView>,
    pub swappable_behind: Vec<NeighborView>,
    pub incoming_swaps: Vec<IncomingSwapView>,
}

pub struct UserFacade {
    ledger: Arc<TokenLedger>,
    negotiator: Arc<SwapNegotiator>,
}

impl UserFacade {
    pub fn new(ledger: Arc<TokenLedger>, negotiator: Arc<SwapNegotiator>) -> Self {
        Self { ledger, negotiator }
    }

    /// Fetch a token, insisting the caller owns it.
    pub fn owned_token(&self, token_id: TokenId, user_id: UserId) -> Result<Token> {
        let token = self.ledger.get_token(token_id)?;
        if token.user_id != user_id {
            return Err(Error::Forbidden(
                "token belongs to a different user".to_string(),
            ));
        }
        Ok(token)
    }

    /// Book a place in a queue.
    pub fn book(&self, user_id: UserId, queue_id: QueueId) -> Result<Token> {
        self.ledger.book_token(queue_id, user_id)
    }

    /// Cancel the caller's token.
    pub fn cancel(&self, token_id: TokenId, user_id: UserId) -> Result<Token> {
        self.owned_token(token_id, user_id)?;
        self.ledger.cancel(token_id)
    }

    /// Step to the back of the line. Costs nothing: deferring never harms
    /// another holder, so no consent and no swap budget is involved.
    pub fn snooze_self(&self, token_id: TokenId, user_id: UserId) -> Result<Token> {
        self.owned_token(token_id, user_id)?;
        self.ledger.reassign_to_back(token_id)
    }

    /// Propose a swap from the caller's token.
    pub fn propose_swap(
        &self,
        token_id: TokenId,
        user_id: UserId,
        target_token_id: TokenId,
        reason: Option<String>,
    ) -> Result<SwapRequest> {
        self.owned_token(token_id, user_id)?;
        self.negotiator.propose(token_id, target_token_id, reason)
    }

    /// Accept a request targeting one of the caller's tokens.
    pub fn accept_swap(&self, swap_id: SwapId, user_id: UserId) -> Result<SwapRequest> {
        self.answerable_swap(swap_id, user_id)?;
        self.negotiator.accept(swap_id)
    }

    /// Reject a request targeting one of the caller's tokens.
    pub fn reject_swap(&self, swap_id: SwapId, user_id: UserId) -> Result<SwapRequest> {
        self.answerable_swap(swap_id, user_id)?;
        self.negotiator.reject(swap_id)
    }

    /// Dispatch a tagged manage action against the caller's token.
    pub fn apply(
        &self,
        token_id: TokenId,
        user_id: UserId,
        action: TokenAction,
    ) -> Result<ActionOutcome> {
        match action {
            TokenAction::Cancel => Ok(ActionOutcome::Token(self.cancel(token_id, user_id)?)),
            TokenAction::Snooze => Ok(ActionOutcome::Token(self.snooze_self(token_id, user_id)?)),
            TokenAction::Swap {
                target_token_id,
                reason,
            } => Ok(ActionOutcome::Swap(self.propose_swap(
                token_id,
                user_id,
                target_token_id,
                reason,
            )?)),
        }
    }

    /// Dashboard lines for every non-terminal token the user holds, in
    /// booking order. Each line is consistent within its own queue
    /// snapshot; cross-queue skew up to the polling interval is fine.
    pub fn dashboard(&self, user_id: UserId) -> Vec<TokenOverview> {
        self.ledger
            .tokens_for_user(user_id)
            .into_iter()
            .filter(|t| t.status.is_active())
            .filter_map(|t| self.overview_of(t.id).ok())
            .collect()
    }

    /// Build the dashboard line for a single token.
    pub fn overview_of(&self, token_id: TokenId) -> Result<TokenOverview> {
        let cell = self.ledger.queue_of(token_id)?;
        let snap = cell.snapshot();
        let token = snap
            .tokens
            .iter()
            .find(|t| t.id == token_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("token {}", token_id)))?;

        let current_serving = snap.current_serving();
        let mut overview = TokenOverview {
            queue_id: snap.id,
            institution_id: snap.institution_id,
            queue_name: snap.name.clone(),
            queue_closed: snap.closed,
            service_time_minutes: snap.service_time_minutes,
            position: None,
            current_serving,
            estimated_wait_minutes: None,
            swappable_ahead: Vec::new(),
            swappable_behind: Vec::new(),
            incoming_swaps: Vec::new(),
            token: token.clone(),
        };
        if token.status != TokenStatus::Waiting {
            return Ok(overview);
        }

        // Waiting tokens sorted by number; the viewer's rank is its index.
        let mut waiting: Vec<&Token> = snap
            .tokens
            .iter()
            .filter(|t| t.status == TokenStatus::Waiting)
            .collect();
        waiting.sort_by_key(|t| t.token_number);
        let rank = waiting
            .iter()
            .position(|t| t.id == token.id)
            .unwrap_or(0);

        overview.position = Some(rank as u32 + 1);
        overview.estimated_wait_minutes = Some((rank as u32 + 1) * snap.service_time_minutes);

        let neighbor = |other: &Token, spots: usize| NeighborView {
            token_id: other.id,
            user_id: other.user_id,
            token_number: other.token_number,
            spots: spots as u32,
            minutes_delta: spots as u32 * snap.service_time_minutes,
        };
        overview.swappable_ahead = waiting[..rank]
            .iter()
            .rev()
            .take(5)
            .enumerate()
            .map(|(i, t)| neighbor(t, i + 1))
            .collect();
        overview.swappable_behind = waiting[rank + 1..]
            .iter()
            .take(5)
            .enumerate()
            .map(|(i, t)| neighbor(t, i + 1))
            .collect();

        let rank_of = |id: TokenId| waiting.iter().position(|t| t.id == id);
        overview.incoming_swaps = snap
            .swaps
            .iter()
            .filter(|s| s.status == SwapStatus::Pending && s.target_token == token.id)
            .filter_map(|s| {
                let source = snap.tokens.iter().find(|t| t.id == s.source_token)?;
                let source_rank = rank_of(source.id)?;
                Some(IncomingSwapView {
                    swap_id: s.id,
                    source_token_id: source.id,
                    source_user_id: source.user_id,
                    source_token_number: source.token_number,
                    spots_behind: source_rank as i64 - rank as i64,
                    reason: s.reason.clone(),
                    created_at: s.created_at,
                })
            })
            .collect();

        Ok(overview)
    }

    fn answerable_swap(&self, swap_id: SwapId, user_id: UserId) -> Result<SwapRequest> {
        let request = self.negotiator.get_swap(swap_id)?;
        let target = self.ledger.get_token(request.target_token)?;
        if target.user_id != user_id {
            return Err(Error::Forbidden(
                "only the target token holder may answer this request".to_string(),
            ));
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::controller::QueueController;
    use crate::core::registry::QueueRegistry;
    use uuid::Uuid;

    struct Fixture {
        ledger: Arc<TokenLedger>,
        controller: QueueController,
        facade: UserFacade,
        institution: InstitutionId,
        queue: QueueId,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(QueueRegistry::new());
        let institution = Uuid::new_v4();
        let snap = registry
            .create_queue(institution, "Records", 50, 5, 8)
            .unwrap();
        let ledger = Arc::new(TokenLedger::new(Arc::clone(&registry)));
        let negotiator = Arc::new(SwapNegotiator::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
        ));
        let controller = QueueController::new(Arc::clone(&registry), Arc::clone(&ledger));
        let facade = UserFacade::new(Arc::clone(&ledger), Arc::clone(&negotiator));
        Fixture {
            ledger,
            controller,
            facade,
            institution,
            queue: snap.id,
        }
    }

    #[test]
    fn test_actions_are_owner_scoped() {
        let f = fixture();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let token = f.facade.book(owner, f.queue).unwrap();

        let err = f.facade.cancel(token.id, stranger).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        let err = f.facade.snooze_self(token.id, stranger).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let cancelled = f.facade.cancel(token.id, owner).unwrap();
        assert_eq!(cancelled.status, TokenStatus::Cancelled);
    }

    #[test]
    fn test_swap_answers_are_target_scoped() {
        let f = fixture();
        let proposer = Uuid::new_v4();
        let target_owner = Uuid::new_v4();
        let source = f.facade.book(proposer, f.queue).unwrap();
        let target = f.facade.book(target_owner, f.queue).unwrap();

        let request = f
            .facade
            .propose_swap(source.id, proposer, target.id, None)
            .unwrap();

        // The proposer cannot answer their own request.
        let err = f.facade.accept_swap(request.id, proposer).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let accepted = f.facade.accept_swap(request.id, target_owner).unwrap();
        assert_eq!(accepted.status, SwapStatus::Accepted);
    }

    #[test]
    fn test_apply_dispatches_tagged_actions() {
        let f = fixture();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let a = f.facade.book(alice, f.queue).unwrap();
        let b = f.facade.book(bob, f.queue).unwrap();

        let action: TokenAction = serde_json::from_str(&format!(
            r#"{{"action": "SWAP", "target_token_id": "{}", "reason": "running late"}}"#,
            b.id
        ))
        .unwrap();
        let outcome = f.facade.apply(a.id, alice, action).unwrap();
        match outcome {
            ActionOutcome::Swap(request) => {
                assert_eq!(request.target_token, b.id);
                assert_eq!(request.reason.as_deref(), Some("running late"));
            }
            ActionOutcome::Token(_) => panic!("expected a swap request"),
        }

        let action: TokenAction = serde_json::from_str(r#"{"action": "CANCEL"}"#).unwrap();
        let outcome = f.facade.apply(a.id, alice, action).unwrap();
        match outcome {
            ActionOutcome::Token(token) => assert_eq!(token.status, TokenStatus::Cancelled),
            ActionOutcome::Swap(_) => panic!("expected a token"),
        }
    }

    #[test]
    fn test_unknown_action_is_rejected_at_parse() {
        let result: std::result::Result<TokenAction, _> =
            serde_json::from_str(r#"{"action": "TELEPORT"}"#);
        assert!(result.is_err());

        // SWAP without its payload is malformed.
        let result: std::result::Result<TokenAction, _> =
            serde_json::from_str(r#"{"action": "SWAP"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_snooze_self_keeps_quota_untouched() {
        let f = fixture();
        let alice = Uuid::new_v4();
        f.facade.book(Uuid::new_v4(), f.queue).unwrap();
        let token = f.facade.book(alice, f.queue).unwrap();

        let snoozed = f.facade.snooze_self(token.id, alice).unwrap();
        assert_eq!(snoozed.swaps_used, 0);
        assert_eq!(snoozed.token_number, 3);
        assert_eq!(snoozed.status, TokenStatus::Waiting);
    }

    #[test]
    fn test_dashboard_assembly() {
        let f = fixture();
        let users: Vec<UserId> = (0..4).map(|_| Uuid::new_v4()).collect();
        let tokens: Vec<Token> = users
            .iter()
            .map(|u| f.facade.book(*u, f.queue).unwrap())
            .collect();

        f.controller.call_next(f.queue, f.institution).unwrap();
        f.facade
            .propose_swap(tokens[3].id, users[3], tokens[2].id, Some("exam".to_string()))
            .unwrap();

        let lines = f.facade.dashboard(users[2]);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.queue_name, "Records");
        assert_eq!(line.position, Some(2));
        assert_eq!(line.current_serving, Some(1));
        assert_eq!(line.estimated_wait_minutes, Some(10));

        // Token 1 is being called, so only token 2 is ahead in the
        // waiting set; token 4 is the one behind.
        assert_eq!(line.swappable_ahead.len(), 1);
        assert_eq!(line.swappable_ahead[0].token_number, 2);
        assert_eq!(line.swappable_ahead[0].spots, 1);
        assert_eq!(line.swappable_behind.len(), 1);
        assert_eq!(line.swappable_behind[0].token_number, 4);

        assert_eq!(line.incoming_swaps.len(), 1);
        let incoming = &line.incoming_swaps[0];
        assert_eq!(incoming.source_token_number, 4);
        assert_eq!(incoming.spots_behind, 1);
        assert_eq!(incoming.reason.as_deref(), Some("exam"));
    }

    #[test]
    fn test_dashboard_skips_terminal_tokens() {
        let f = fixture();
        let alice = Uuid::new_v4();
        let token = f.facade.book(alice, f.queue).unwrap();
        assert_eq!(f.facade.dashboard(alice).len(), 1);

        f.facade.cancel(token.id, alice).unwrap();
        assert!(f.facade.dashboard(alice).is_empty());
    }

    #[test]
    fn test_calling_token_overview_has_no_rank() {
        let f = fixture();
        let alice = Uuid::new_v4();
        let token = f.facade.book(alice, f.queue).unwrap();
        f.controller.call_next(f.queue, f.institution).unwrap();

        let lines = f.facade.dashboard(alice);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].token.id, token.id);
        assert_eq!(lines[0].token.status, TokenStatus::Calling);
        assert_eq!(lines[0].position, None);
        assert_eq!(lines[0].current_serving, Some(1));
        assert!(lines[0].swappable_ahead.is_empty());
    }
}
