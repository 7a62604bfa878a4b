//! Analytics vendor client.
//!
//! The relay talks to the vendor through [`AnalyticsClient`] so the HTTP
//! layer can be exercised without a network. [`MixpanelClient`] is the
//! production implementation against Mixpanel's ingestion API.

use crate::config::MixpanelConfig;
use crate::protocol::Properties;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum VendorError {
    #[error("Mixpanel token is not configured")]
    MissingToken,
    #[error("HTTP client error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Request rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait AnalyticsClient: Send + Sync {
    /// Upserts profile properties for `distinct_id`. Last write wins.
    async fn set_user_properties(
        &self,
        distinct_id: &str,
        properties: &Properties,
    ) -> Result<(), VendorError>;

    /// Records a single event. `properties` already carries `distinct_id`.
    async fn track(&self, event: &str, properties: &Properties) -> Result<JsonValue, VendorError>;

    /// Whether a credential is available to send with.
    fn is_configured(&self) -> bool;
}

#[derive(Serialize)]
struct TrackPayload<'a> {
    event: &'a str,
    properties: Properties,
}

#[derive(Serialize)]
struct EngagePayload<'a> {
    #[serde(rename = "$token")]
    token: &'a str,
    #[serde(rename = "$distinct_id")]
    distinct_id: &'a str,
    #[serde(rename = "$set")]
    set: &'a Properties,
}

#[derive(Clone)]
pub struct MixpanelClient {
    client: reqwest::Client,
    api_url: Url,
    token: Option<String>,
}

impl MixpanelClient {
    pub fn new(config: &MixpanelConfig) -> Result<Self, VendorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(MixpanelClient {
            client,
            api_url: config.api_url.clone(),
            token: config.token.clone(),
        })
    }

    fn token(&self) -> Result<&str, VendorError> {
        self.token.as_deref().ok_or(VendorError::MissingToken)
    }

    /// `api_url` with `segment` appended, keeping any path prefix.
    fn endpoint(&self, segment: &str) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(segment);
        }
        url.set_query(Some("verbose=1"));
        url
    }

    /// Posts a batch to `segment` and checks the verbose `{"status": 1}` reply.
    async fn send<T: Serialize + ?Sized>(
        &self,
        segment: &str,
        batch: &T,
    ) -> Result<JsonValue, VendorError> {
        let response = self
            .client
            .post(self.endpoint(segment))
            .json(batch)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VendorError::Status { status, body });
        }

        let reply: JsonValue = response.json().await?;
        match reply.get("status").and_then(JsonValue::as_i64) {
            Some(1) => Ok(reply),
            _ => {
                let reason = reply
                    .get("error")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("unknown error");
                Err(VendorError::Rejected(reason.to_string()))
            }
        }
    }
}

#[async_trait]
impl AnalyticsClient for MixpanelClient {
    async fn set_user_properties(
        &self,
        distinct_id: &str,
        properties: &Properties,
    ) -> Result<(), VendorError> {
        let payload = EngagePayload {
            token: self.token()?,
            distinct_id,
            set: properties,
        };

        self.send("engage", &[payload]).await?;
        tracing::debug!(user_id = distinct_id, "Profile updated");
        Ok(())
    }

    async fn track(&self, event: &str, properties: &Properties) -> Result<JsonValue, VendorError> {
        let mut properties = properties.clone();
        properties.insert("token".into(), self.token()?.into());

        let reply = self
            .send("track", &[TrackPayload { event, properties }])
            .await?;
        tracing::debug!(event, "Event recorded");
        Ok(reply)
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}
