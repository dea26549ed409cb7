use std::sync::Arc;

use crate::config::Settings;
use crate::services::Resolver;
use crate::store::QrStore;

pub struct AppState {
    pub store: Arc<dyn QrStore>,
    pub resolver: Resolver,
    pub settings: Settings,
}

impl AppState {
    pub fn new(store: Arc<dyn QrStore>, settings: Settings) -> Self {
        let resolver = Resolver::new(Arc::clone(&store), settings.accounting_timeout);
        Self {
            store,
            resolver,
            settings,
        }
    }
}
