//! Parameters for the HubSpot integration endpoints.

use domain::hubspot::CallbackQuery;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Parameters identifying the tenant starting an OAuth flow
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AuthorizeParams {
    pub user_id: String,
    pub org_id: String,
}

/// Query parameters HubSpot appends to the OAuth callback redirect
#[derive(Debug, Deserialize, IntoParams)]
pub struct OAuthCallbackParams {
    /// Authorization code to exchange for tokens
    pub code: Option<String>,
    /// Encoded state payload from the authorize step
    pub state: Option<String>,
    /// Error code when the user denied consent
    pub error: Option<String>,
    /// Human-readable description of the error
    pub error_description: Option<String>,
}

impl From<OAuthCallbackParams> for CallbackQuery {
    fn from(params: OAuthCallbackParams) -> Self {
        CallbackQuery {
            code: params.code,
            state: params.state,
            error: params.error,
            error_description: params.error_description,
        }
    }
}

/// Parameters identifying the tenant reading its cached credentials
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CredentialsParams {
    pub user_id: String,
    pub org_id: String,
}

/// Request body carrying the credential blob for an item load
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoadItemsParams {
    /// The provider token response as returned by the credentials endpoint
    #[schema(value_type = Object)]
    pub credentials: serde_json::Value,
}
