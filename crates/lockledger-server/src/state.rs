use std::sync::Arc;

use lockledger_core::{BatchUpdater, LedgerStore};
use lockledger_store::ObjectAccessor;
use lockledger_types::Clock;

use crate::config::ServerConfig;
use crate::query::PageLimits;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LedgerStore<dyn ObjectAccessor>>,
    pub updater: Arc<BatchUpdater<dyn ObjectAccessor>>,
    pub limits: PageLimits,
}

impl AppState {
    pub fn new(
        accessor: Arc<dyn ObjectAccessor>,
        clock: Arc<dyn Clock>,
        config: &ServerConfig,
    ) -> Self {
        let store = Arc::new(LedgerStore::new(accessor, clock, config.ledger_config()));
        Self {
            updater: Arc::new(BatchUpdater::new(store.clone())),
            store,
            limits: PageLimits {
                default_size: config.default_page_size,
                max_size: config.max_page_size,
            },
        }
    }
}
