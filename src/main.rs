use log::info;
use service::config::Config;
use service::logging::Logger;
use service::store::KeyValueStore;
use service::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();

    Logger::init_logger(&config);

    info!(
        "Starting integrations platform, runtime environment: {}",
        config.runtime_env()
    );

    let store = service::init_store(&config)
        .await
        .expect("Failed to connect to the key-value store");
    let store: Arc<dyn KeyValueStore> = Arc::new(store);

    let app_state = AppState::new(config, &store);

    web::init_server(app_state)
        .await
        .expect("Failed to start the API server");
}
