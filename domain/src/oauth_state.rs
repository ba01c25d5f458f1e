//! CSRF state payload for the OAuth authorization flow.
//!
//! The payload travels base64url(JSON)-encoded in the redirect's `state` query
//! parameter while the unencoded JSON is kept in the store, keyed by tenant.
//! The callback decodes the returned parameter and compares tokens.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DomainErrorKind, Error, FlowErrorKind, InternalErrorKind};

/// State data stored during an OAuth flow and round-tripped through the
/// provider redirect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    /// CSRF token compared between the redirect and the stored record.
    pub state: String,
    pub user_id: String,
    pub org_id: String,
}

impl StatePayload {
    /// Create a payload with a fresh random token for the given tenant.
    pub fn new(user_id: &str, org_id: &str) -> Self {
        Self {
            state: Self::generate_token(),
            user_id: user_id.to_string(),
            org_id: org_id.to_string(),
        }
    }

    /// Serialize the payload to the JSON form kept in the store.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "Failed to serialize state payload".to_string(),
            )),
        })
    }

    /// Encode the payload for transport in the `state` query parameter.
    pub fn encode(&self) -> Result<String, Error> {
        Ok(URL_SAFE.encode(self.to_json()?))
    }

    /// Decode a `state` query parameter back into a payload.
    ///
    /// Any malformed input (bad base64, bad JSON) is a flow error surfaced to
    /// the caller as a bad request.
    pub fn decode(encoded: &str) -> Result<Self, Error> {
        let bytes = URL_SAFE.decode(encoded).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: DomainErrorKind::Flow(FlowErrorKind::MalformedState),
        })?;

        serde_json::from_slice(&bytes).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: DomainErrorKind::Flow(FlowErrorKind::MalformedState),
        })
    }

    /// Generate a cryptographically random state token.
    fn generate_token() -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        URL_SAFE_NO_PAD.encode(random_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let payload = StatePayload::new("user_1", "org_1");
        let encoded = payload.encode().unwrap();

        let decoded = StatePayload::decode(&encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let first = StatePayload::new("user_1", "org_1");
        let second = StatePayload::new("user_1", "org_1");
        assert_ne!(first.state, second.state);
    }

    #[test]
    fn test_token_encodes_32_random_bytes() {
        let payload = StatePayload::new("user_1", "org_1");
        // 32 bytes base64url encoded without padding
        assert_eq!(payload.state.len(), 43);
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let result = StatePayload::decode("not base64!!!");
        match result {
            Err(e) => assert_eq!(
                e.error_kind,
                DomainErrorKind::Flow(FlowErrorKind::MalformedState)
            ),
            Ok(_) => panic!("Expected a malformed state error"),
        }
    }

    #[test]
    fn test_decode_rejects_valid_base64_invalid_json() {
        let encoded = URL_SAFE.encode("not a payload");
        let result = StatePayload::decode(&encoded);
        match result {
            Err(e) => assert_eq!(
                e.error_kind,
                DomainErrorKind::Flow(FlowErrorKind::MalformedState)
            ),
            Ok(_) => panic!("Expected a malformed state error"),
        }
    }
}
