//! JSON responses.

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::{Response, StatusCode};
use serde::Serialize;
use sigroute_core::{RequestId, RouteError, REQUEST_ID_HEADER};

const APPLICATION_JSON: &str = "application/json";

const FALLBACK_BODY: &str =
    r#"{"error":{"code":"INTERNAL_ERROR","message":"failed to encode error","category":"internal"}}"#;

/// Serializes `body` into a JSON response.
///
/// # Errors
///
/// Returns an internal error when `body` does not serialize.
pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    body: &T,
) -> Result<Response<Bytes>, RouteError> {
    let bytes = serde_json::to_vec(body)
        .map_err(|e| RouteError::internal_with_source("failed to serialize response", e))?;

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, APPLICATION_JSON)
        .body(Bytes::from(bytes))
        .map_err(|e| RouteError::internal_with_source("failed to build response", e))
}

/// Renders `error` as a JSON error envelope.
///
/// A `405` carries the `Allow` header.
pub fn error_response(error: &RouteError, request_id: RequestId) -> Response<Bytes> {
    let id = request_id.to_string();
    let envelope = error.to_envelope(Some(&id));
    let body = serde_json::to_vec(&envelope).map_or_else(
        |_| Bytes::from_static(FALLBACK_BODY.as_bytes()),
        Bytes::from,
    );

    let mut response = Response::new(body);
    *response.status_mut() = error.status_code();

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    if let Ok(value) = HeaderValue::from_str(&id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let RouteError::MethodNotAllowed { allowed, .. } = error {
        if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
            headers.insert(ALLOW, value);
        }
    }

    response
}

/// Adds the request id header to a handler's response if it has none.
pub(crate) fn tag_request_id(response: &mut Response<Bytes>, request_id: RequestId) {
    if response.headers().contains_key(REQUEST_ID_HEADER) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}
