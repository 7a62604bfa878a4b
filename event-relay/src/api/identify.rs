use crate::api::utils::{
    HandlerBody, deserialize_body, failure_response, json_response, record_vendor_call,
};
use crate::errors::{RelayError, RequiredField, Result};
use crate::mixpanel::AnalyticsClient;
use crate::protocol::{IdentifyRequest, IdentifyResponse, non_empty};
use hyper::body::Body;
use hyper::{Response, StatusCode};

pub const IDENTIFIED: &str = "Usuario identificado en Mixpanel";
pub const IDENTIFY_FAILED: &str = "Error al identificar usuario";

/// Upserts the caller's profile properties on the vendor.
pub async fn identify(
    client: &dyn AnalyticsClient,
    request: IdentifyRequest,
) -> Result<IdentifyResponse> {
    let user_id =
        non_empty(request.user_id).ok_or(RelayError::MissingField(RequiredField::UserId))?;
    let properties = request.user_properties.unwrap_or_default();

    let result = client.set_user_properties(&user_id, &properties).await;
    record_vendor_call("set_user_properties", result.is_ok());
    result.inspect_err(|e| {
        tracing::error!(user_id = %user_id, error = %e, "Failed to identify user");
    })?;

    tracing::info!(user_id = %user_id, "User identified");
    Ok(IdentifyResponse {
        success: true,
        message: IDENTIFIED,
        user_id,
    })
}

pub async fn handle<B>(client: &dyn AnalyticsClient, body: B) -> Response<HandlerBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let result = match deserialize_body::<IdentifyRequest, _>(body).await {
        Ok(request) => identify(client, request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(e) => {
            let response = failure_response(&e, IDENTIFY_FAILED);
            if response.status().is_client_error() {
                tracing::warn!(error = %e, "Rejected identify request");
            }
            response
        }
    }
}
