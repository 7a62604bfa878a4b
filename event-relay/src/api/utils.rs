use crate::errors::{RelayError, Result};
use crate::metrics_defs::VENDOR_CALLS;
use crate::protocol::ErrorResponse;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::http::make_error_response;

pub type HandlerBody = BoxBody<Bytes, RelayError>;

/// Largest JSON body accepted on the storefront routes.
pub const MAX_BODY_BYTES: usize = 100 * 1024;

pub const INVALID_BODY: &str = "Cuerpo de solicitud inválido";
pub const BODY_TOO_LARGE: &str = "Cuerpo de solicitud demasiado grande";

/// Deserializes a JSON request body. An empty body reads as `T::default()`.
pub async fn deserialize_body<T, B>(body: B) -> Result<T>
where
    T: DeserializeOwned + Default,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = Limited::new(body, MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                RelayError::PayloadTooLarge(MAX_BODY_BYTES)
            } else {
                RelayError::RequestBodyError(e.to_string())
            }
        })?
        .to_bytes();

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(&bytes).map_err(|e| RelayError::InvalidBody(e.to_string()))
}

/// Serializes `value` into a JSON response with the given status.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<HandlerBody> {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response");
            return make_error_response(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut response = Response::new(Full::new(bytes).map_err(|e| match e {}).boxed());
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

pub fn error_response(status: StatusCode, message: &'static str) -> Response<HandlerBody> {
    json_response(status, &ErrorResponse { error: message })
}

/// Maps a route failure to what the caller sees. Vendor-side failures all
/// collapse to `failure_message` so vendor details never leave the relay.
pub fn failure_response(error: &RelayError, failure_message: &'static str) -> Response<HandlerBody> {
    match error {
        RelayError::MissingField(field) => error_response(StatusCode::BAD_REQUEST, field.message()),
        RelayError::InvalidBody(_) | RelayError::RequestBodyError(_) => {
            error_response(StatusCode::BAD_REQUEST, INVALID_BODY)
        }
        RelayError::PayloadTooLarge(_) => error_response(StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE),
        RelayError::InvalidProperties { .. }
        | RelayError::Vendor(_)
        | RelayError::TaskFailed(_)
        | RelayError::Io(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, failure_message),
    }
}

pub fn record_vendor_call(operation: &'static str, succeeded: bool) {
    let outcome = if succeeded { "success" } else { "failure" };
    shared::counter!(VENDOR_CALLS, "operation" => operation, "outcome" => outcome).increment(1);
}
