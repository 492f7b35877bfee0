//! The virtual queue engine.
//!
//! Ordering rules, the token state machine, swap negotiation, and the
//! per-queue locking discipline that keeps them consistent. Everything
//! here is synchronous and in-memory; queues are day-scoped entities.

pub mod controller;
pub mod facade;
pub mod ledger;
pub mod queue;
pub mod registry;
pub mod swap;
pub mod token;
