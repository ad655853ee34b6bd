use std::sync::Arc;

use crate::config::Config;
use crate::db::CollabStore;
use crate::services::assist_service::AssistService;
use crate::ws::CollabHub;

/// Shared by every handler and socket. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn CollabStore>,
    pub hub: Arc<CollabHub>,
    /// None when no LLM API key is configured
    pub assist: Option<Arc<AssistService>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CollabStore>) -> Self {
        let hub = Arc::new(CollabHub::new(store.clone()));
        Self {
            config: Arc::new(config),
            store,
            hub,
            assist: None,
        }
    }

    pub fn with_assist(mut self, assist: AssistService) -> Self {
        self.assist = Some(Arc::new(assist));
        self
    }
}
