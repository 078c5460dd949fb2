use crate::config::Config;
use std::sync::Arc;
use store::{PromptSetResolver, Store};
use upstream::{CatalogClient, Dispatcher, GenerativeClient};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub prompt_sets: Arc<dyn PromptSetResolver>,
    pub dispatcher: Dispatcher,
    /// `None` when no generative AI key is configured.
    pub generative: Option<GenerativeClient>,
    pub catalog: CatalogClient,
}

impl AppState {
    pub fn new(store: Store, config: &Config) -> Self {
        let generative = GenerativeClient::from_config(&config.generative_ai);
        if generative.is_none() {
            tracing::warn!("No generative AI key configured, AI responses are disabled");
        }

        AppState {
            prompt_sets: Arc::new(store.prompt_sets.clone()),
            store,
            dispatcher: Dispatcher::new(config.dispatch.clone()),
            generative,
            catalog: CatalogClient::new(&config.sync),
        }
    }
}
