//! Wire types for the storefront-facing routes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Event or profile properties, kept in the order the caller sent them.
pub type Properties = IndexMap<String, JsonValue>;

/// Body of `POST /identify`.
///
/// # Example
/// ```json
/// { "userId": "u1", "userProperties": { "$email": "a@b.c" } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_properties: Option<Properties>,
}

/// Body of `POST /track`.
///
/// # Example
/// ```json
/// { "event": "Order", "userId": "u1", "properties": { "orderId": "o1", "items": [] } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub properties: Option<Properties>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyResponse {
    pub success: bool,
    pub message: &'static str,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub success: bool,
    pub message: &'static str,
    pub event_name: String,
    pub user_id: String,
    /// One value for single events, a sequence for fanned-out events.
    pub mixpanel_response: JsonValue,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub mixpanel_token: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

/// Treats a missing, null or empty identifier as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
