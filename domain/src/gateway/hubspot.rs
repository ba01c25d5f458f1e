//! HubSpot OAuth and CRM API client.
//!
//! This module provides an HTTP client for interacting with HubSpot's OAuth
//! token endpoint and the CRM v3 contacts listing.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use log::*;
use serde::{Deserialize, Serialize};
use service::config::Config;

/// Number of contacts requested per page.
pub const CONTACTS_PAGE_LIMIT: u32 = 100;

/// Scopes requested during authorization.
const OAUTH_SCOPES: &str = "crm.objects.contacts.read oauth";

/// Request to exchange an authorization code for tokens
#[derive(Debug, Serialize)]
struct TokenExchangeRequest {
    grant_type: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    code: String,
}

/// One page of the paginated contacts listing
#[derive(Debug, Deserialize)]
pub struct ContactsPage {
    #[serde(default)]
    pub results: Vec<Contact>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl ContactsPage {
    /// Cursor for the next page, if the listing continues.
    pub fn next_cursor(&self) -> Option<&str> {
        Some(self.paging.as_ref()?.next.as_ref()?.after.as_str())
    }
}

/// Pagination envelope of the contacts listing
#[derive(Debug, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<PagingNext>,
}

/// Cursor for the page following the current one
#[derive(Debug, Deserialize)]
pub struct PagingNext {
    pub after: String,
}

/// One contact record as returned by the CRM listing
#[derive(Debug, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: ContactProperties,
    // Millisecond epoch timestamps; kept as raw JSON because the wire type
    // is not guaranteed (number or numeric string).
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<serde_json::Value>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<serde_json::Value>,
}

/// Name properties of a contact record
#[derive(Debug, Default, Deserialize)]
pub struct ContactProperties {
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
}

/// HubSpot client for the OAuth flow and the contacts listing
pub struct HubSpotClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    app_base_url: String,
    api_base_url: String,
}

impl HubSpotClient {
    /// Create a new HubSpot client from config.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client_id = config.hubspot_client_id().ok_or_else(|| Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        })?;

        let client_secret = config.hubspot_client_secret().ok_or_else(|| Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        })?;

        let client = reqwest::Client::builder().use_rustls_tls().build()?;

        Ok(Self {
            client,
            client_id,
            client_secret,
            redirect_uri: config.hubspot_redirect_uri().to_string(),
            app_base_url: config.hubspot_app_base_url().to_string(),
            api_base_url: config.hubspot_api_base_url().to_string(),
        })
    }

    /// Generate the OAuth authorization URL for user consent.
    ///
    /// `encoded_state` must already be in its transport encoding.
    pub fn authorization_url(&self, encoded_state: &str) -> String {
        format!(
            "{}/oauth/authorize?\
            client_id={}&\
            redirect_uri={}&\
            scope={}&\
            state={}",
            self.app_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(OAUTH_SCOPES),
            urlencoding::encode(encoded_state)
        )
    }

    /// Base URL of the HubSpot application, used for record links.
    pub fn app_base_url(&self) -> &str {
        &self.app_base_url
    }

    /// Exchange an authorization code for the provider's token response.
    ///
    /// The response is returned as the raw JSON blob; callers treat it as
    /// opaque credentials.
    pub async fn exchange_code(&self, code: &str) -> Result<serde_json::Value, Error> {
        let request = TokenExchangeRequest {
            grant_type: "authorization_code".to_string(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            code: code.to_string(),
        };

        debug!("Exchanging HubSpot OAuth code for tokens");

        let response = self
            .client
            .post(format!("{}/oauth/v1/token", self.api_base_url))
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to exchange HubSpot OAuth code: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
                }
            })?;

        if response.status().is_success() {
            let tokens: serde_json::Value = response.json().await.map_err(|e| {
                warn!("Failed to parse HubSpot token response: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                        "Invalid response from HubSpot token endpoint".to_string(),
                    )),
                }
            })?;
            info!("Successfully exchanged HubSpot OAuth code for tokens");
            Ok(tokens)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            warn!("HubSpot token endpoint error: {}", error_text);
            Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(error_text)),
            })
        }
    }

    /// Fetch one page of the contacts listing.
    ///
    /// `after` carries the pagination cursor returned by the previous page.
    pub async fn fetch_contacts_page(
        &self,
        access_token: &str,
        after: Option<&str>,
    ) -> Result<ContactsPage, Error> {
        let mut request = self
            .client
            .get(format!("{}/crm/v3/objects/contacts", self.api_base_url))
            .bearer_auth(access_token)
            .query(&[("limit", CONTACTS_PAGE_LIMIT.to_string())]);

        if let Some(cursor) = after {
            request = request.query(&[("after", cursor)]);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Failed to fetch HubSpot contacts page: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        })?;

        if response.status().is_success() {
            response.json().await.map_err(|e| {
                warn!("Failed to parse HubSpot contacts response: {:?}", e);
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                        "Invalid response from HubSpot contacts endpoint".to_string(),
                    )),
                }
            })
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("HubSpot contacts endpoint error: {} - {}", status, error_text);
            Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(format!(
                    "HubSpot contacts request failed with status {status}"
                ))),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn create_config_with_mock(server_url: &str) -> Config {
        env::set_var("HUBSPOT_CLIENT_ID", "client_123");
        env::set_var("HUBSPOT_CLIENT_SECRET", "secret_456");
        env::set_var("HUBSPOT_APP_BASE_URL", server_url);
        env::set_var("HUBSPOT_API_BASE_URL", server_url);
        Config::default()
    }

    #[tokio::test]
    #[serial]
    async fn test_authorization_url_contains_client_and_state() {
        let config = create_config_with_mock("https://app.example.test");
        let client = HubSpotClient::new(&config).unwrap();

        let url = client.authorization_url("c3RhdGU=");

        assert!(url.starts_with("https://app.example.test/oauth/authorize?"));
        assert!(url.contains("client_id=client_123"));
        assert!(url.contains("scope=crm.objects.contacts.read%20oauth"));
        assert!(url.contains("state=c3RhdGU%3D"));
    }

    #[tokio::test]
    #[serial]
    async fn test_new_without_client_id_is_config_error() {
        env::remove_var("HUBSPOT_CLIENT_ID");
        env::set_var("HUBSPOT_CLIENT_SECRET", "secret_456");
        let config = Config::default();

        let result = HubSpotClient::new(&config);
        match result {
            Err(e) => assert_eq!(
                e.error_kind,
                DomainErrorKind::Internal(InternalErrorKind::Config)
            ),
            Ok(_) => panic!("Expected a config error"),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_exchange_code_posts_form_and_returns_blob() {
        let mut server = mockito::Server::new_async().await;
        let config = create_config_with_mock(&server.url());

        let _mock = server
            .mock("POST", "/oauth/v1/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), "client_123".into()),
                mockito::Matcher::UrlEncoded("client_secret".into(), "secret_456".into()),
                mockito::Matcher::UrlEncoded("code".into(), "auth_code_789".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token": "tok_abc", "refresh_token": "ref_def"}"#)
            .create_async()
            .await;

        let client = HubSpotClient::new(&config).unwrap();
        let tokens = client.exchange_code("auth_code_789").await.unwrap();

        assert_eq!(tokens["access_token"], "tok_abc");
        assert_eq!(tokens["refresh_token"], "ref_def");
    }

    #[tokio::test]
    #[serial]
    async fn test_exchange_code_error_status_is_external_error() {
        let mut server = mockito::Server::new_async().await;
        let config = create_config_with_mock(&server.url());

        let _mock = server
            .mock("POST", "/oauth/v1/token")
            .with_status(400)
            .with_body(r#"{"status": "BAD_AUTH_CODE"}"#)
            .create_async()
            .await;

        let client = HubSpotClient::new(&config).unwrap();
        let result = client.exchange_code("expired_code").await;

        match result {
            Err(e) => match e.error_kind {
                DomainErrorKind::External(ExternalErrorKind::Other(_)) => {}
                other => panic!("Expected an external error, got: {:?}", other),
            },
            Ok(_) => panic!("Expected the exchange to fail"),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_fetch_contacts_page_passes_cursor() {
        let mut server = mockito::Server::new_async().await;
        let config = create_config_with_mock(&server.url());

        let _mock = server
            .mock("GET", "/crm/v3/objects/contacts")
            .match_header("authorization", "Bearer tok_abc")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("limit".into(), "100".into()),
                mockito::Matcher::UrlEncoded("after".into(), "cursor_99".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"results": [{"id": "7"}]}"#)
            .create_async()
            .await;

        let client = HubSpotClient::new(&config).unwrap();
        let page = client
            .fetch_contacts_page("tok_abc", Some("cursor_99"))
            .await
            .unwrap();

        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id.as_deref(), Some("7"));
        assert!(page.next_cursor().is_none());
    }
}
