use std::sync::Arc;

use crate::database_ops::exchange::CurrencyProvider;
use crate::database_ops::store::BasketStore;
use crate::orchestrator::ProductRetrieval;
use crate::util::client_log::ClientLog;

/// Shared handler state, registered once as `web::Data<AppState>`.
pub struct AppState {
    pub retrieval: ProductRetrieval,
    pub baskets: Arc<dyn BasketStore>,
    pub currency: Arc<dyn CurrencyProvider>,
    pub client_log: ClientLog,
}
