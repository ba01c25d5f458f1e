//! Normalized item shape shared across provider integrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One remote record, normalized. Immutable after construction; optional
/// fields stay unset when the provider record type has no counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IntegrationItem {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub parent_id: Option<String>,
    pub parent_path_or_name: Option<String>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub creation_time: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_modified_time: Option<DateTime<Utc>>,
    pub url: Option<String>,
}
