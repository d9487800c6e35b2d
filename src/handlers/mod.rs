pub mod dispatches;
pub mod inventory;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub inventory: Arc<crate::services::inventory::InventoryService>,
    pub dispatches: Arc<crate::services::dispatch::DispatchService>,
    pub reporting: Arc<crate::services::reporting::DispatchReportingService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        let inventory = crate::services::inventory::InventoryService::new(db_pool.clone());
        let dispatches = Arc::new(crate::services::dispatch::DispatchService::new(
            db_pool.clone(),
            inventory.clone(),
            event_sender,
        ));
        let reporting = Arc::new(crate::services::reporting::DispatchReportingService::new(
            db_pool,
        ));

        Self {
            inventory: Arc::new(inventory),
            dispatches,
            reporting,
        }
    }
}
