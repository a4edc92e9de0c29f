//! Shared application state.

use domain::{CatalogService, OrderService, ReportService};
use store::Store;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub orders: OrderService<S>,
    pub catalog: CatalogService<S>,
    pub reports: ReportService<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Builds every service over one store.
    pub fn new(store: S) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            reports: ReportService::new(store),
        }
    }
}
