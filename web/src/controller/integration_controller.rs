//! Controller for HubSpot credential handoff and item loading.

use crate::controller::ApiResponse;
use crate::extractors::compare_api_version::CompareApiVersion;
use crate::params::integration::{CredentialsParams, LoadItemsParams};
use crate::{AppState, Error};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use domain::hubspot;
use service::config::ApiVersion;

/// POST read the cached credentials for a tenant
///
/// Single-use: the record is deleted on read, so a second call without
/// re-running the OAuth flow fails.
#[utoipa::path(
    post,
    path = "/integrations/hubspot/credentials",
    params(ApiVersion),
    request_body = CredentialsParams,
    responses(
        (status = 200, description = "Credential blob returned and consumed", body = serde_json::Value),
        (status = 400, description = "No credentials found"),
    )
)]
pub async fn credentials(
    CompareApiVersion(_v): CompareApiVersion,
    State(app_state): State<AppState>,
    Json(params): Json<CredentialsParams>,
) -> Result<impl IntoResponse, Error> {
    let credentials =
        hubspot::credentials(app_state.store_ref(), &params.user_id, &params.org_id).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), credentials)))
}

/// POST fetch and normalize HubSpot contacts
///
/// Pages through the contacts listing with the supplied credential blob. A
/// listing that stops early is returned as a partial outcome rather than an
/// error.
#[utoipa::path(
    post,
    path = "/integrations/hubspot/items",
    params(ApiVersion),
    request_body = LoadItemsParams,
    responses(
        (status = 200, description = "Normalized items returned", body = hubspot::ItemFetchOutcome),
        (status = 400, description = "No access token found in credentials"),
    )
)]
pub async fn load_items(
    CompareApiVersion(_v): CompareApiVersion,
    State(app_state): State<AppState>,
    Json(params): Json<LoadItemsParams>,
) -> Result<impl IntoResponse, Error> {
    let outcome = hubspot::load_items(&app_state.config, &params.credentials).await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), outcome)))
}
