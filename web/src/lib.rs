use axum::http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method};
use log::*;
use tower_http::cors::CorsLayer;

pub(crate) mod controller;
pub(crate) mod error;
pub(crate) mod extractors;
pub(crate) mod params;
pub mod router;

pub use error::Error;
pub use service::AppState;

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let config = app_state.config.clone();
    let host = config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let listen_address = format!("{}:{}", host, config.port);

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-version")])
        .allow_credentials(true);

    info!("Server starting... listening on {}", listen_address);

    let listener = tokio::net::TcpListener::bind(&listen_address).await?;
    axum::serve(listener, router::define_routes(app_state).layer(cors)).await
}
