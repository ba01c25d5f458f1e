//! Error types for the `domain` layer.
use service::store::Error as StoreError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries: `domain` is dependent on `service`, and `web` is dependent on `domain`,
/// but `web` should not be dependent, directly, on the store or transport crates.
/// Ultimately the various `error_kind`s are used by `web` to return appropriate HTTP
/// status codes and messages to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Flow(FlowErrorKind),
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing user/flow failures in the OAuth exchange. These are the
/// conditions a caller can correct by restarting the flow, and the `web` layer
/// surfaces each of them as a bad request with a human-readable message.
#[derive(Debug, PartialEq)]
pub enum FlowErrorKind {
    /// The provider denied consent; carries the provider's `error_description`.
    ProviderDenied(String),
    /// The `state` query parameter could not be decoded back into a payload.
    MalformedState,
    /// The decoded state token does not match the stored one (or none is stored).
    StateMismatch,
    /// The callback carried no authorization code.
    MissingCode,
    /// No credential record exists for the tenant (or it was already consumed).
    MissingCredentials,
    /// The credential blob carries no `access_token`.
    MissingAccessToken,
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Store,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the store collaborator to the `domain` layer.
impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Store),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}
