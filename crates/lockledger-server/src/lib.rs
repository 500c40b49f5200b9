//! HTTP server for the Lock Ledger.
//!
//! Exposes a container's ledger for browsing (search and pagination), batch
//! hold/retention/metadata edits committed against the ledger version the
//! client last saw, and single-object reconciliation. All ledger work runs
//! on the blocking pool.

pub mod api;
pub mod config;
pub mod error;
pub mod handler;
pub mod query;
pub mod router;
pub mod server;
pub mod state;

pub use api::{endpoints, FileUpdate, FilesPage, HealthResponse, LockStatusBody};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult, RELOAD_HINT};
pub use server::LedgerServer;
pub use state::AppState;
