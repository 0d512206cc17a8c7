//! Response builders. Every response carries permissive CORS headers.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "*"),
    ("access-control-allow-headers", "*"),
];

const JSON_CONTENT_TYPE: (&str, &str) = ("content-type", "application/json");

/// Build a response with the given headers plus the CORS headers.
///
/// Headers with an invalid name or value are skipped with a warning.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in CORS_HEADERS {
        builder = builder.header(key, value);
    }
    for (key, value) in headers {
        let (key, value) = (key.as_ref(), value.as_ref());
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => builder = builder.header(name, value),
            _ => warn!("Skipping invalid response header {:?}: {:?}", key, value),
        }
    }

    // 204 and 304 never carry a body
    let body = if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        Bytes::new()
    } else {
        body.into()
    };

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        warn!("Failed to build response: {}", e);
        let mut response = Response::new(Full::new(Bytes::from("Internal Server Error")));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        for (key, value) in CORS_HEADERS {
            response
                .headers_mut()
                .insert(HeaderName::from_static(key), HeaderValue::from_static(value));
        }
        response
    })
}

/// Serialize `body` as compact JSON with a JSON content type.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [JSON_CONTENT_TYPE], json)
}

/// Map a configured status to a [`StatusCode`], using 200 for invalid codes.
pub fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or_else(|_| {
        warn!("Invalid status {} in mock definition, using 200", status);
        StatusCode::OK
    })
}

/// Answer to a CORS preflight.
pub fn preflight() -> Response<Full<Bytes>> {
    no_content()
}

pub fn no_content() -> Response<Full<Bytes>> {
    build_response_with_headers(StatusCode::NO_CONTENT, std::iter::empty::<(&str, &str)>(), "")
}

/// 404 for a request no route matched.
pub fn not_found(method: &str, path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &json!({"error": "Mock not found", "method": method, "path": path}),
    )
}
