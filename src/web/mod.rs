//! HTTP surface: axum server, sessions, and API handlers.

pub mod api;
pub mod auth;
pub mod error;
pub mod router;
pub mod server;

use std::sync::Arc;

use crate::config::Settings;
use crate::core::controller::QueueController;
use crate::core::facade::UserFacade;
use crate::core::ledger::TokenLedger;
use crate::core::registry::QueueRegistry;
use crate::core::swap::SwapNegotiator;
use crate::directory::Directory;
use crate::error::Result;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub directory: Arc<Directory>,
    pub registry: Arc<QueueRegistry>,
    pub ledger: Arc<TokenLedger>,
    pub controller: Arc<QueueController>,
    pub facade: Arc<UserFacade>,
}

impl AppState {
    /// Wire up the engine and its collaborators from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let directory = Arc::new(Directory::new(settings.directory_db_path()?));
        let registry = Arc::new(QueueRegistry::new());
        let ledger = Arc::new(TokenLedger::new(Arc::clone(&registry)));
        let negotiator = Arc::new(SwapNegotiator::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
        ));
        let controller = Arc::new(QueueController::new(
            Arc::clone(&registry),
            Arc::clone(&ledger),
        ));
        let facade = Arc::new(UserFacade::new(Arc::clone(&ledger), negotiator));

        Ok(Self {
            settings: Arc::new(settings),
            directory,
            registry,
            ledger,
            controller,
            facade,
        })
    }

    /// Signing secret for session tokens.
    pub fn jwt_secret(&self) -> &[u8] {
        self.settings
            .auth
            .jwt_secret
            .as_deref()
            .map(str::as_bytes)
            .unwrap_or(auth::DEFAULT_JWT_SECRET)
    }

    /// Session lifetime in seconds.
    pub fn token_ttl(&self) -> u64 {
        self.settings.auth.token_ttl_secs
    }
}
