use std::sync::Arc;

use lockledger_store::{InMemoryAccessor, ObjectAccessor};
use lockledger_types::{Clock, SystemClock};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Lock Ledger HTTP server.
pub struct LedgerServer {
    config: ServerConfig,
    state: AppState,
}

impl LedgerServer {
    pub fn new(config: ServerConfig, accessor: Arc<dyn ObjectAccessor>, clock: Arc<dyn Clock>) -> Self {
        let state = AppState::new(accessor, clock, &config);
        Self { config, state }
    }

    /// Build a server over the in-memory store, seeded from `config.seed` if set.
    pub fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let accessor = match &config.seed {
            Some(path) => {
                let data = std::fs::read(path)?;
                let store = InMemoryAccessor::from_seed_json(&data, clock.clone())?;
                tracing::info!(seed = %path.display(), "loaded seed data");
                store
            }
            None => InMemoryAccessor::with_clock(clock.clone()),
        };
        for container in &config.containers {
            accessor.create_container(container)?;
        }
        Ok(Self::new(config, Arc::new(accessor), clock))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> ServerResult<axum::Router> {
        build_router(self.state.clone(), &self.config.allowed_origins)
    }

    /// Restore the hold on every configured container's ledger.
    ///
    /// Returns how many ledgers needed it. Failures are logged and skipped.
    pub async fn recover(&self) -> ServerResult<usize> {
        let store = self.state.store.clone();
        let containers = self.config.containers.clone();
        tokio::task::spawn_blocking(move || {
            containers
                .iter()
                .filter(|container| match store.recover_protection(container) {
                    Ok(recovered) => recovered,
                    Err(error) => {
                        tracing::warn!(container = %container, %error, "ledger recovery skipped");
                        false
                    }
                })
                .count()
        })
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))
    }

    /// Recover ledger holds, then start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let recovered = self.recover().await?;
        let app = self.router()?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            recovered,
            "lockledger server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
