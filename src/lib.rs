//! waitless: a virtual queue and token-exchange service.
//!
//! Users hold numbered tokens in institution queues, staff advance
//! service by calling the next token, and holders negotiate pairwise
//! position swaps. The engine keeps each queue's ordering consistent
//! under concurrent staff and user actions; everything else is
//! plumbing around it.

pub mod cli;
pub mod config;
pub mod core;
pub mod directory;
pub mod error;
pub mod logging;
pub mod web;

pub use error::{Error, Result};
