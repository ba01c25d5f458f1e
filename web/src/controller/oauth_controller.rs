//! Controller for the HubSpot OAuth flow.
//!
//! Note: the callback endpoint doesn't use CompareApiVersion because it is
//! reached via the provider's browser redirect, which cannot set custom
//! headers.

use crate::controller::ApiResponse;
use crate::extractors::compare_api_version::CompareApiVersion;
use crate::params::integration::{AuthorizeParams, OAuthCallbackParams};
use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;

use domain::hubspot;
use service::config::ApiVersion;

/// Minimal page whose only purpose is closing the popup window that started
/// the flow.
const CLOSE_WINDOW_HTML: &str = "\
<html>
    <script>
        window.close();
    </script>
</html>
";

/// POST start a HubSpot OAuth flow
///
/// Persists a short-lived state record for the tenant and returns the
/// authorization URL the frontend opens in a popup.
#[utoipa::path(
    post,
    path = "/integrations/hubspot/authorize",
    params(ApiVersion),
    request_body = AuthorizeParams,
    responses(
        (status = 200, description = "Authorization URL generated", body = String),
        (status = 500, description = "Server error (HubSpot OAuth not configured)"),
    )
)]
pub async fn authorize(
    CompareApiVersion(_v): CompareApiVersion,
    State(app_state): State<AppState>,
    Json(params): Json<AuthorizeParams>,
) -> Result<impl IntoResponse, Error> {
    let url = hubspot::authorize(
        app_state.store_ref(),
        &app_state.config,
        &params.user_id,
        &params.org_id,
    )
    .await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), url)))
}

/// GET handle the OAuth callback from HubSpot
///
/// Validates the state parameter, exchanges the authorization code for tokens,
/// and responds with a page that closes the popup.
#[utoipa::path(
    get,
    path = "/integrations/hubspot/oauth2callback",
    params(OAuthCallbackParams),
    responses(
        (status = 200, description = "Flow completed; response closes the popup window", body = String),
        (status = 400, description = "Consent denied, malformed state, or state mismatch"),
        (status = 502, description = "Token exchange failed"),
    )
)]
pub async fn oauth2callback(
    State(app_state): State<AppState>,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<impl IntoResponse, Error> {
    hubspot::complete_oauth(app_state.store_ref(), &app_state.config, &params.into()).await?;

    Ok(Html(CLOSE_WINDOW_HTML))
}
