use std::sync::Arc;

use crate::auth::JwtKeys;
use crate::services::{CatalogService, Clock, OrderPolicy, OrderService};
use crate::store::Store;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub orders: OrderService,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        policy: OrderPolicy,
        jwt: JwtKeys,
    ) -> Self {
        Self {
            catalog: CatalogService::new(store.clone(), clock.clone()),
            orders: OrderService::new(store, clock, policy),
            jwt,
        }
    }
}
