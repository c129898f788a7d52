pub mod config;
pub mod models;
pub mod services;
pub mod algorithms;
pub mod utils;

pub use config::Config;
pub use models::*;

use anyhow::Result;
use algorithms::{FuzzyEngine, Ranker};
use services::store::{
    CatalogView, InMemoryCatalog, InMemoryInteractionLog, InMemorySessionStore, InteractionLog,
    SessionStore,
};
use std::sync::Arc;
use utils::IdAllocator;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<dyn CatalogView>,
    pub interactions: Arc<dyn InteractionLog>,
    pub sessions: Arc<dyn SessionStore>,
    pub preference_service: Arc<services::preference::PreferenceService>,
    pub recommendation_service: Arc<services::recommendation::RecommendationService>,
    pub session_service: Arc<services::session::SessionService>,
}

impl AppState {
    /// Loads the configured catalog file, or starts empty when none is set.
    pub fn new(config: Config) -> Result<Self> {
        let catalog = match config.catalog.path.as_deref() {
            Some(path) if std::path::Path::new(path).exists() => {
                InMemoryCatalog::from_json_file(path)?
            }
            Some(path) => {
                tracing::warn!("Catalog file {} not found, starting with an empty catalog", path);
                InMemoryCatalog::new()
            }
            None => InMemoryCatalog::new(),
        };
        Ok(Self::with_catalog(config, Arc::new(catalog)))
    }

    pub fn with_catalog(config: Config, catalog: Arc<dyn CatalogView>) -> Self {
        let config = Arc::new(config);

        let interactions: Arc<dyn InteractionLog> =
            Arc::new(InMemoryInteractionLog::new(Arc::new(IdAllocator::new())));
        let sessions: Arc<dyn SessionStore> =
            Arc::new(InMemorySessionStore::new(Arc::new(IdAllocator::new())));

        let preference_service = Arc::new(services::preference::PreferenceService::new(
            interactions.clone(),
            catalog.clone(),
        ));

        let recommendation_service = Arc::new(
            services::recommendation::RecommendationService::new(
                catalog.clone(),
                interactions.clone(),
                sessions.clone(),
                preference_service.clone(),
                Ranker::new(Arc::new(FuzzyEngine::new())),
                config.clone(),
            ),
        );

        let session_service = Arc::new(services::session::SessionService::new(
            sessions.clone(),
            interactions.clone(),
            catalog.clone(),
            config.clone(),
        ));

        Self {
            config,
            catalog,
            interactions,
            sessions,
            preference_service,
            recommendation_service,
            session_service,
        }
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
