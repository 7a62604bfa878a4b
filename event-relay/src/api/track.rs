use crate::api::utils::{
    HandlerBody, deserialize_body, failure_response, json_response, record_vendor_call,
};
use crate::errors::{RelayError, RequiredField, Result};
use crate::events::{Dispatch, EventKind, VendorEvent};
use crate::metrics_defs::EVENTS_TRACKED;
use crate::mixpanel::AnalyticsClient;
use crate::protocol::{Properties, TrackRequest, TrackResponse, non_empty};
use hyper::body::Body;
use hyper::{Response, StatusCode};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::task::JoinSet;

pub const TRACKED: &str = "Evento(s) enviado(s) a Mixpanel";
pub const TRACK_FAILED: &str = "Error al procesar el evento";

/// Validates, reshapes and forwards one storefront event.
pub async fn track(
    client: &Arc<dyn AnalyticsClient>,
    request: TrackRequest,
) -> Result<TrackResponse> {
    let event =
        non_empty(request.event).ok_or(RelayError::MissingField(RequiredField::EventName))?;
    let user_id =
        non_empty(request.user_id).ok_or(RelayError::MissingField(RequiredField::UserId))?;

    let kind = EventKind::from_name(&event);
    let properties = request.properties.unwrap_or_default();

    let mixpanel_response = plan_and_forward(client, kind, &event, properties, &user_id)
        .await
        .inspect_err(|e| {
            tracing::error!(event = %event, user_id = %user_id, error = %e, "Failed to forward event");
        })?;

    shared::counter!(EVENTS_TRACKED, "kind" => kind.as_str()).increment(1);
    tracing::info!(event = %event, user_id = %user_id, "Event forwarded");

    Ok(TrackResponse {
        success: true,
        message: TRACKED,
        event_name: event,
        user_id,
        mixpanel_response,
    })
}

async fn plan_and_forward(
    client: &Arc<dyn AnalyticsClient>,
    kind: EventKind,
    event: &str,
    properties: Properties,
    user_id: &str,
) -> Result<JsonValue> {
    let dispatch = kind.plan(event, properties, user_id)?;
    tracing::debug!(
        event,
        kind = kind.as_str(),
        calls = dispatch.len(),
        "Forwarding event"
    );

    match dispatch {
        Dispatch::Single(event) => send(client.as_ref(), &event).await,
        Dispatch::FanOut(events) => fan_out(client, events).await.map(JsonValue::Array),
    }
}

/// Sends every event concurrently and returns the replies in input order.
///
/// The first failure wins: returning drops the join set, which aborts the
/// calls still in flight.
async fn fan_out(
    client: &Arc<dyn AnalyticsClient>,
    events: Vec<VendorEvent>,
) -> Result<Vec<JsonValue>> {
    let mut join_set = JoinSet::new();
    let mut replies = vec![JsonValue::Null; events.len()];

    for (index, event) in events.into_iter().enumerate() {
        let client = client.clone();
        join_set.spawn(async move {
            let result = send(client.as_ref(), &event).await;
            (index, result)
        });
    }

    while let Some(joined) = join_set.join_next().await {
        let (index, result) = joined?;
        replies[index] = result?;
    }

    Ok(replies)
}

async fn send(client: &dyn AnalyticsClient, event: &VendorEvent) -> Result<JsonValue> {
    let result = client.track(&event.name, &event.properties).await;
    record_vendor_call("track", result.is_ok());
    Ok(result?)
}

pub async fn handle<B>(client: &Arc<dyn AnalyticsClient>, body: B) -> Response<HandlerBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let result = match deserialize_body::<TrackRequest, _>(body).await {
        Ok(request) => track(client, request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => {
            let response = failure_response(&e, TRACK_FAILED);
            if response.status().is_client_error() {
                tracing::warn!(error = %e, "Rejected track request");
            }
            response
        }
    }
}
