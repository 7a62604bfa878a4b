use crate::mixpanel::{AnalyticsClient, VendorError};
use crate::protocol::Properties;
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Identify {
        distinct_id: String,
        properties: Properties,
    },
    Track {
        event: String,
        properties: Properties,
    },
}

type FailWhen = Box<dyn Fn(&Call) -> bool + Send + Sync>;

/// In-memory analytics client that records every call.
///
/// Track calls answer `{"status": 1, "product": <ProductId>}` so fan-out
/// ordering is visible in responses.
pub struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    fail_when: Option<FailWhen>,
    slow_product: Option<(String, Duration)>,
    configured: bool,
}

impl RecordingClient {
    pub fn new() -> Self {
        RecordingClient {
            calls: Mutex::new(Vec::new()),
            fail_when: None,
            slow_product: None,
            configured: true,
        }
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self::new().fail_when(|_| true)
    }

    pub fn unconfigured() -> Self {
        RecordingClient {
            configured: false,
            ..Self::new()
        }
    }

    pub fn fail_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Call) -> bool + Send + Sync + 'static,
    {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    /// Delays the track call carrying `ProductId == product`.
    pub fn slow_product(mut self, product: &str, delay: Duration) -> Self {
        self.slow_product = Some((product.to_string(), delay));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded track calls as `(event, properties)`.
    pub fn tracked(&self) -> Vec<(String, Properties)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Track { event, properties } => Some((event, properties)),
                Call::Identify { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> Result<(), VendorError> {
        let fails = self.fail_when.as_ref().is_some_and(|f| f(&call));
        self.calls.lock().unwrap().push(call);

        match fails {
            true => Err(VendorError::Rejected("simulated failure".into())),
            false => Ok(()),
        }
    }
}

#[async_trait]
impl AnalyticsClient for RecordingClient {
    async fn set_user_properties(
        &self,
        distinct_id: &str,
        properties: &Properties,
    ) -> Result<(), VendorError> {
        self.record(Call::Identify {
            distinct_id: distinct_id.to_string(),
            properties: properties.clone(),
        })
    }

    async fn track(&self, event: &str, properties: &Properties) -> Result<JsonValue, VendorError> {
        let product = properties.get("ProductId").cloned().unwrap_or(JsonValue::Null);

        if let Some((slow, delay)) = &self.slow_product
            && product == slow.as_str()
        {
            tokio::time::sleep(*delay).await;
        }

        self.record(Call::Track {
            event: event.to_string(),
            properties: properties.clone(),
        })?;
        Ok(json!({"status": 1, "product": product}))
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
