//! Durable account directory: users and institutions.

pub mod store;

pub use store::{Directory, InstitutionRecord, UserRecord};
