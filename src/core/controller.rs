//! Staff-side orchestration: advancing service through a queue.
//!
//! `call_next` is linearizable per queue: the queue lock serializes
//! concurrent staff calls, so a losing caller observes a clean
//! `AlreadyCalling` or `QueueEmpty` instead of a corrupted line.

#![allow(dead_code)]

use crate::core::ledger::TokenLedger;
use crate::core::registry::QueueRegistry;
use crate::core::token::{InstitutionId, QueueId, Token, TokenId, TokenStatus};
use crate::error::{Error, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub struct QueueController {
    registry: Arc<QueueRegistry>,
    ledger: Arc<TokenLedger>,
}

impl QueueController {
    pub fn new(registry: Arc<QueueRegistry>, ledger: Arc<TokenLedger>) -> Self {
        Self { registry, ledger }
    }

    /// Call the waiting token with the smallest number to the service
    /// point. Fails if another token is already being called; staff must
    /// confirm or snooze it first.
    pub fn call_next(&self, queue_id: QueueId, institution_id: InstitutionId) -> Result<Token> {
        let cell = self.registry.get(queue_id)?;
        if cell.institution_id != institution_id {
            return Err(Error::Forbidden(
                "queue belongs to a different institution".to_string(),
            ));
        }

        let token = {
            let mut state = cell.lock();
            if state.calling_token().is_some() {
                return Err(Error::AlreadyCalling);
            }
            let next_id = state.next_waiting().ok_or(Error::QueueEmpty)?;
            let token = state
                .token_mut(next_id)
                .ok_or_else(|| Error::NotFound(format!("token {}", next_id)))?;
            token.status = TokenStatus::Calling;
            token.called_at = Some(Utc::now());
            token.clone()
        };

        info!(
            "Calling token #{} in queue {}",
            token.token_number, queue_id
        );
        Ok(token)
    }

    /// Mark the CALLING token as served. Frees the calling slot.
    pub fn confirm(&self, token_id: TokenId, institution_id: InstitutionId) -> Result<Token> {
        let cell = self.ledger.queue_of(token_id)?;
        if cell.institution_id != institution_id {
            return Err(Error::Forbidden(
                "token belongs to a different institution".to_string(),
            ));
        }

        let token = {
            let mut state = cell.lock();
            let token = state
                .token_mut(token_id)
                .ok_or_else(|| Error::NotFound(format!("token {}", token_id)))?;
            if token.status != TokenStatus::Calling {
                return Err(Error::TokenNotCalling);
            }
            token.status = TokenStatus::Completed;
            token.clone()
        };

        info!(
            "Completed token #{} in queue {}",
            token.token_number, cell.id
        );
        Ok(token)
    }

    /// Send a token to the back of the line without cancelling it. Works
    /// on WAITING and CALLING tokens; a snoozed CALLING token frees the
    /// calling slot.
    pub fn snooze_by_staff(
        &self,
        token_id: TokenId,
        institution_id: InstitutionId,
    ) -> Result<Token> {
        let cell = self.ledger.queue_of(token_id)?;
        if cell.institution_id != institution_id {
            return Err(Error::Forbidden(
                "token belongs to a different institution".to_string(),
            ));
        }
        self.ledger.reassign_to_back(token_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use uuid::Uuid;

    struct Fixture {
        registry: Arc<QueueRegistry>,
        ledger: Arc<TokenLedger>,
        controller: Arc<QueueController>,
        institution: InstitutionId,
        queue: QueueId,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(QueueRegistry::new());
        let institution = Uuid::new_v4();
        let snap = registry
            .create_queue(institution, "Counter", 50, 5, 8)
            .unwrap();
        let ledger = Arc::new(TokenLedger::new(Arc::clone(&registry)));
        let controller = Arc::new(QueueController::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
        ));
        Fixture {
            registry,
            ledger,
            controller,
            institution,
            queue: snap.id,
        }
    }

    #[test]
    fn test_call_next_takes_the_front_token() {
        let f = fixture();
        let t1 = f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();
        let t2 = f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();
        let t3 = f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();

        let called = f.controller.call_next(f.queue, f.institution).unwrap();
        assert_eq!(called.id, t1.id);
        assert_eq!(called.status, TokenStatus::Calling);
        assert!(called.called_at.is_some());

        // Remaining holders move up one rank each.
        assert_eq!(f.ledger.compute_position(t2.id).unwrap(), 1);
        assert_eq!(f.ledger.compute_position(t3.id).unwrap(), 2);
    }

    #[test]
    fn test_call_next_refuses_while_calling() {
        let f = fixture();
        f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();
        f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();

        f.controller.call_next(f.queue, f.institution).unwrap();
        let err = f.controller.call_next(f.queue, f.institution).unwrap_err();
        assert!(matches!(err, Error::AlreadyCalling));
    }

    #[test]
    fn test_call_next_on_empty_queue() {
        let f = fixture();
        let err = f.controller.call_next(f.queue, f.institution).unwrap_err();
        assert!(matches!(err, Error::QueueEmpty));
    }

    #[test]
    fn test_confirm_completes_and_frees_the_slot() {
        let f = fixture();
        let t1 = f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();
        let t2 = f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();

        f.controller.call_next(f.queue, f.institution).unwrap();
        let done = f.controller.confirm(t1.id, f.institution).unwrap();
        assert_eq!(done.status, TokenStatus::Completed);

        let next = f.controller.call_next(f.queue, f.institution).unwrap();
        assert_eq!(next.id, t2.id);
    }

    #[test]
    fn test_confirm_requires_calling_status() {
        let f = fixture();
        let t1 = f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();

        let err = f.controller.confirm(t1.id, f.institution).unwrap_err();
        assert!(matches!(err, Error::TokenNotCalling));
    }

    #[test]
    fn test_cancelled_calling_token_is_skipped() {
        let f = fixture();
        let t1 = f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();
        let t2 = f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();

        f.controller.call_next(f.queue, f.institution).unwrap();
        let cancelled = f.ledger.cancel(t1.id).unwrap();
        assert_eq!(cancelled.status, TokenStatus::Cancelled);

        let next = f.controller.call_next(f.queue, f.institution).unwrap();
        assert_eq!(next.id, t2.id);
        assert_eq!(next.status, TokenStatus::Calling);
    }

    #[test]
    fn test_staff_snooze_sends_calling_token_to_the_back() {
        let f = fixture();
        let t1 = f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();
        let t2 = f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();

        f.controller.call_next(f.queue, f.institution).unwrap();
        let snoozed = f.controller.snooze_by_staff(t1.id, f.institution).unwrap();
        assert_eq!(snoozed.status, TokenStatus::Waiting);
        assert_eq!(snoozed.token_number, 3);
        assert!(snoozed.called_at.is_none());

        let next = f.controller.call_next(f.queue, f.institution).unwrap();
        assert_eq!(next.id, t2.id);
    }

    #[test]
    fn test_staff_actions_are_owner_scoped() {
        let f = fixture();
        let stranger = Uuid::new_v4();
        let t1 = f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();

        let err = f.controller.call_next(f.queue, stranger).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        let err = f.controller.confirm(t1.id, stranger).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        let err = f.controller.snooze_by_staff(t1.id, stranger).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_concurrent_call_next_single_winner() {
        let f = fixture();
        f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let controller = Arc::clone(&f.controller);
            let barrier = Arc::clone(&barrier);
            let queue = f.queue;
            let institution = f.institution;
            handles.push(thread::spawn(move || {
                barrier.wait();
                controller.call_next(queue, institution)
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        for result in results {
            if let Err(err) = result {
                assert!(matches!(err, Error::AlreadyCalling | Error::QueueEmpty));
            }
        }
    }

    #[test]
    fn test_at_most_one_calling_under_contention() {
        let f = fixture();
        for _ in 0..10 {
            f.ledger.book_token(f.queue, Uuid::new_v4()).unwrap();
        }

        let barrier = Arc::new(Barrier::new(8));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let controller = Arc::clone(&f.controller);
            let barrier = Arc::clone(&barrier);
            let queue = f.queue;
            let institution = f.institution;
            handles.push(thread::spawn(move || {
                barrier.wait();
                controller.call_next(queue, institution).is_ok()
            }));
        }

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);

        let cell = f.registry.get(f.queue).unwrap();
        let snap = cell.snapshot();
        let calling = snap
            .tokens
            .iter()
            .filter(|t| t.status == TokenStatus::Calling)
            .count();
        assert_eq!(calling, 1);
    }
}
