use crate::controller::{health_check_controller, integration_controller, oauth_controller};
use crate::{params, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Integrations Platform API"
        ),
        paths(
            health_check_controller::health_check,
            oauth_controller::authorize,
            oauth_controller::oauth2callback,
            integration_controller::credentials,
            integration_controller::load_items,
        ),
        components(
            schemas(
                domain::integration_item::IntegrationItem,
                domain::hubspot::ItemFetchOutcome,
                params::integration::AuthorizeParams,
                params::integration::CredentialsParams,
                params::integration::LoadItemsParams,
            )
        ),
        tags(
            (name = "integrations_platform", description = "Third-party CRM Integrations API")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(hubspot_oauth_routes(app_state.clone()))
        .merge(hubspot_integration_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
        .fallback_service(static_routes())
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

/// Routes for the HubSpot OAuth flow
fn hubspot_oauth_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/integrations/hubspot/authorize",
            post(oauth_controller::authorize),
        )
        .merge(
            // Callback is reached via HubSpot's redirect, not by our frontend
            Router::new().route(
                "/integrations/hubspot/oauth2callback",
                get(oauth_controller::oauth2callback),
            ),
        )
        .with_state(app_state)
}

/// Routes for credential handoff and item loading
fn hubspot_integration_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/integrations/hubspot/credentials",
            post(integration_controller::credentials),
        )
        .route(
            "/integrations/hubspot/items",
            post(integration_controller::load_items),
        )
        .with_state(app_state)
}

// This will serve static files that we can use as a "fallback" for when the server panics
pub fn static_routes() -> Router {
    Router::new().fallback_service(ServeDir::new("./"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serial_test::serial;
    use service::config::{ApiVersion, Config};
    use service::store::{KeyValueStore, MemoryStore};
    use std::env;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state(server_url: &str) -> AppState {
        env::set_var("HUBSPOT_CLIENT_ID", "client_123");
        env::set_var("HUBSPOT_CLIENT_SECRET", "secret_456");
        env::set_var("HUBSPOT_APP_BASE_URL", server_url);
        env::set_var("HUBSPOT_API_BASE_URL", server_url);
        let config = Config::default();

        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        AppState::new(config, &store)
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn test_health_check_responds_ok() {
        let app = define_routes(create_test_state("https://app.example.test"));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "healthy");
    }

    #[tokio::test]
    #[serial]
    async fn test_authorize_returns_authorization_url() {
        let app = define_routes(create_test_state("https://app.example.test"));

        let request = Request::builder()
            .method("POST")
            .uri("/integrations/hubspot/authorize")
            .header("content-type", "application/json")
            .header(ApiVersion::field_name(), ApiVersion::default_version())
            .body(Body::from(
                r#"{"user_id": "user_1", "org_id": "org_1"}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["status_code"], 200);
        let url = body["data"].as_str().unwrap();
        assert!(url.starts_with("https://app.example.test/oauth/authorize?"));
        assert!(url.contains("state="));
    }

    #[tokio::test]
    #[serial]
    async fn test_authorize_without_version_header_is_rejected() {
        let app = define_routes(create_test_state("https://app.example.test"));

        let request = Request::builder()
            .method("POST")
            .uri("/integrations/hubspot/authorize")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"user_id": "user_1", "org_id": "org_1"}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "Missing x-version header");
    }

    #[tokio::test]
    #[serial]
    async fn test_callback_with_provider_error_surfaces_description() {
        let app = define_routes(create_test_state("https://app.example.test"));

        let request = Request::builder()
            .uri(
                "/integrations/hubspot/oauth2callback?\
                 error=access_denied&error_description=User%20denied%20access",
            )
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "User denied access");
    }

    #[tokio::test]
    #[serial]
    async fn test_callback_with_unknown_state_reports_mismatch() {
        let app = define_routes(create_test_state("https://app.example.test"));

        let payload = domain::oauth_state::StatePayload::new("user_1", "org_1");
        let encoded = payload.encode().unwrap();
        let request = Request::builder()
            .uri(format!(
                "/integrations/hubspot/oauth2callback?code=auth_code&state={}",
                urlencoding::encode(&encoded)
            ))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "State does not match.");
    }

    #[tokio::test]
    #[serial]
    async fn test_credentials_without_record_fails() {
        let app = define_routes(create_test_state("https://app.example.test"));

        let request = Request::builder()
            .method("POST")
            .uri("/integrations/hubspot/credentials")
            .header("content-type", "application/json")
            .header(ApiVersion::field_name(), ApiVersion::default_version())
            .body(Body::from(
                r#"{"user_id": "user_1", "org_id": "org_1"}"#,
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "No credentials found.");
    }

    #[tokio::test]
    #[serial]
    async fn test_load_items_without_access_token_fails() {
        let app = define_routes(create_test_state("https://app.example.test"));

        let request = Request::builder()
            .method("POST")
            .uri("/integrations/hubspot/items")
            .header("content-type", "application/json")
            .header(ApiVersion::field_name(), ApiVersion::default_version())
            .body(Body::from(r#"{"credentials": {"token_type": "bearer"}}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_string(response).await,
            "No access token found in credentials."
        );
    }
}
