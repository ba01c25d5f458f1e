use config::Config;
use log::info;
use std::sync::Arc;
use store::{KeyValueStore, RedisStore};

pub mod config;
pub mod logging;
pub mod store;

pub async fn init_store(config: &Config) -> Result<RedisStore, store::Error> {
    info!("Connecting to key-value store at {}", config.redis_url());

    let store = RedisStore::connect(config.redis_url()).await?;

    Ok(store)
}

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(app_config: Config, store: &Arc<dyn KeyValueStore>) -> Self {
        Self {
            store: Arc::clone(store),
            config: app_config,
        }
    }

    pub fn store_ref(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }
}
