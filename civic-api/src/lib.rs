pub mod config;
pub mod demo;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod storage;

use std::sync::Arc;

use config::AppConfig;
use services::moderation::ProfanityFilter;
use storage::Storage;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: AppConfig,
    pub filter: ProfanityFilter,
    /// Serializes destructive maintenance operations (demo reset).
    pub maintenance: tokio::sync::Mutex<()>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, config: AppConfig) -> Self {
        let filter = ProfanityFilter::new(config.profanity_list());
        Self {
            storage,
            config,
            filter,
            maintenance: tokio::sync::Mutex::new(()),
        }
    }
}
