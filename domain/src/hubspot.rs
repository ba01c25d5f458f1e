//! HubSpot integration flow: authorization, callback completion, single-use
//! credential handoff, and the paginated contact fetch.

use chrono::{DateTime, Utc};
use log::*;
use serde::Serialize;
use service::config::Config;
use service::store::KeyValueStore;
use std::time::Duration;
use utoipa::ToSchema;

use crate::error::{DomainErrorKind, Error, FlowErrorKind, InternalErrorKind};
use crate::gateway::hubspot::{Contact, HubSpotClient};
use crate::integration_item::IntegrationItem;
use crate::oauth_state::StatePayload;

/// How long a pending state record stays valid.
const STATE_TTL: Duration = Duration::from_secs(600);

/// How long exchanged credentials stay readable before their single use.
const CREDENTIALS_TTL: Duration = Duration::from_secs(600);

const CONTACT_ITEM_TYPE: &str = "Contact";

fn state_key(org_id: &str, user_id: &str) -> String {
    format!("hubspot_state:{org_id}:{user_id}")
}

fn credentials_key(org_id: &str, user_id: &str) -> String {
    format!("hubspot_credentials:{org_id}:{user_id}")
}

/// Query parameters HubSpot appends to the OAuth callback redirect.
#[derive(Debug, Clone, Default)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Result of an item fetch. `partial` marks a listing that stopped early;
/// `last_error` carries the failure that ended it.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemFetchOutcome {
    pub items: Vec<IntegrationItem>,
    pub partial: bool,
    pub last_error: Option<String>,
}

/// Start an OAuth flow for a tenant: persist a fresh state record and build
/// the authorization URL the caller redirects the user to.
///
/// A new call overwrites any state record still pending for the tenant.
pub async fn authorize(
    store: &dyn KeyValueStore,
    config: &Config,
    user_id: &str,
    org_id: &str,
) -> Result<String, Error> {
    let client = HubSpotClient::new(config)?;

    let payload = StatePayload::new(user_id, org_id);
    let encoded_state = payload.encode()?;

    store
        .set(&state_key(org_id, user_id), &payload.to_json()?, STATE_TTL)
        .await?;

    info!("Redirecting user {} (org {}) to HubSpot OAuth", user_id, org_id);
    Ok(client.authorization_url(&encoded_state))
}

/// Complete the OAuth flow from the provider redirect: validate state,
/// exchange the code, and cache the resulting credential blob.
pub async fn complete_oauth(
    store: &dyn KeyValueStore,
    config: &Config,
    callback: &CallbackQuery,
) -> Result<(), Error> {
    if callback.error.is_some() {
        let description = callback.error_description.clone().unwrap_or_default();
        warn!("HubSpot denied authorization: {}", description);
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Flow(FlowErrorKind::ProviderDenied(description)),
        });
    }

    let encoded_state = callback.state.as_deref().ok_or_else(|| Error {
        source: None,
        error_kind: DomainErrorKind::Flow(FlowErrorKind::MalformedState),
    })?;
    let payload = StatePayload::decode(encoded_state)?;

    let pending_key = state_key(&payload.org_id, &payload.user_id);
    let saved_state = store.get(&pending_key).await?;

    // The token in the redirect must match the one stored at authorize time.
    let state_matches = saved_state
        .as_deref()
        .and_then(|raw| serde_json::from_str::<StatePayload>(raw).ok())
        .map(|stored| stored.state == payload.state)
        .unwrap_or(false);

    if !state_matches {
        warn!(
            "HubSpot OAuth state mismatch for user {} (org {})",
            payload.user_id, payload.org_id
        );
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Flow(FlowErrorKind::StateMismatch),
        });
    }

    let code = callback.code.as_deref().ok_or_else(|| Error {
        source: None,
        error_kind: DomainErrorKind::Flow(FlowErrorKind::MissingCode),
    })?;

    let client = HubSpotClient::new(config)?;

    // The exchange and the state deletion are independent; run them together,
    // but both must have completed before the credentials are cached.
    let (tokens, deleted) = tokio::join!(client.exchange_code(code), store.delete(&pending_key));
    let tokens = tokens?;
    deleted?;

    store
        .set(
            &credentials_key(&payload.org_id, &payload.user_id),
            &tokens.to_string(),
            CREDENTIALS_TTL,
        )
        .await?;

    info!(
        "Stored HubSpot credentials for user {} (org {})",
        payload.user_id, payload.org_id
    );
    Ok(())
}

/// Read and consume the cached credential blob for a tenant.
///
/// The record is deleted on read: a second call without re-running the
/// authorization flow fails.
pub async fn credentials(
    store: &dyn KeyValueStore,
    user_id: &str,
    org_id: &str,
) -> Result<serde_json::Value, Error> {
    let key = credentials_key(org_id, user_id);

    let raw = store.get(&key).await?.ok_or_else(|| Error {
        source: None,
        error_kind: DomainErrorKind::Flow(FlowErrorKind::MissingCredentials),
    })?;

    let parsed: serde_json::Value = serde_json::from_str(&raw).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
            "Stored credentials are not valid JSON".to_string(),
        )),
    })?;

    store.delete(&key).await?;

    Ok(parsed)
}

/// Fetch all HubSpot contacts reachable with the given credential blob and
/// normalize them into integration items.
///
/// Pagination is strictly sequential. A failed page ends the listing: the
/// outcome is marked partial and carries whatever accumulated, rather than
/// failing the whole call. Only a blob without an access token is an error.
pub async fn load_items(
    config: &Config,
    credentials: &serde_json::Value,
) -> Result<ItemFetchOutcome, Error> {
    let access_token = credentials
        .get("access_token")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| Error {
            source: None,
            error_kind: DomainErrorKind::Flow(FlowErrorKind::MissingAccessToken),
        })?;

    let client = HubSpotClient::new(config)?;

    let mut outcome = ItemFetchOutcome {
        items: Vec::new(),
        partial: false,
        last_error: None,
    };
    let mut cursor: Option<String> = None;

    loop {
        match client.fetch_contacts_page(access_token, cursor.as_deref()).await {
            Ok(page) => {
                let next = page.next_cursor().map(str::to_string);
                for contact in &page.results {
                    outcome.items.push(contact_item(contact, client.app_base_url()));
                }
                match next {
                    Some(after) => cursor = Some(after),
                    None => break,
                }
            }
            Err(e) => {
                warn!("HubSpot contact listing stopped early: {e}");
                outcome.partial = true;
                outcome.last_error = Some(e.to_string());
                break;
            }
        }
    }

    info!(
        "Fetched {} HubSpot contact(s){}",
        outcome.items.len(),
        if outcome.partial { " (partial)" } else { "" }
    );
    Ok(outcome)
}

/// Normalize one contact record into an integration item.
fn contact_item(contact: &Contact, app_base_url: &str) -> IntegrationItem {
    let firstname = contact.properties.firstname.as_deref().unwrap_or_default();
    let lastname = contact.properties.lastname.as_deref().unwrap_or_default();

    IntegrationItem {
        id: contact.id.clone(),
        // The joining space is always present, even when a name part is
        // missing; downstream consumers rely on the exact concatenation.
        name: format!("{firstname} {lastname}"),
        item_type: CONTACT_ITEM_TYPE.to_string(),
        parent_id: None,
        parent_path_or_name: None,
        creation_time: parse_epoch_millis(contact.created_at.as_ref()),
        last_modified_time: parse_epoch_millis(contact.updated_at.as_ref()),
        url: contact
            .id
            .as_ref()
            .map(|id| format!("{app_base_url}/contacts/{id}")),
    }
}

/// Parse a millisecond epoch timestamp (JSON number or numeric string).
/// Anything else maps to `None`, never an error.
fn parse_epoch_millis(value: Option<&serde_json::Value>) -> Option<DateTime<Utc>> {
    let millis = match value? {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }?;

    DateTime::from_timestamp_millis(millis)
}
