//! Request handling for the mock server.
//!
//! [`handle_mock_request`] buffers the body and hands over to [`dispatch`],
//! which is synchronous: matching, rendering and any state-store append all
//! happen without an await point.

use super::core::ServerShared;
use super::response::{
    build_response_with_headers, json_response, no_content, not_found, preflight, status_code,
};
use super::routes::normalize_request_path;
use super::template::render_or_fallback;
use crate::bundle::{json_headers, ResponseDefinition};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use rand::Rng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

/// Status for a stateful mutation whose definition sets none.
const STATEFUL_DEFAULT_STATUS: u16 = 201;

/// Handle one HTTP request.
pub async fn handle_mock_request(
    req: Request<Incoming>,
    shared: Arc<ServerShared>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() == Method::OPTIONS {
        return Ok(preflight());
    }

    let method = req.method().as_str().to_ascii_uppercase();
    let path = normalize_request_path(req.uri().path());

    let body = match req.into_body().collect().await {
        Ok(collected) => parse_body(&collected.to_bytes()),
        Err(e) => {
            debug!("Failed to read request body for {} {}: {}", method, path, e);
            empty_object()
        }
    };

    Ok(dispatch(&shared, &method, &path, &body))
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// Parse a request body as JSON; anything unparseable is an empty object.
pub fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return empty_object();
    }
    serde_json::from_slice(bytes).unwrap_or_else(|_| empty_object())
}

fn is_mutation(method: &str) -> bool {
    matches!(method, "POST" | "PUT" | "PATCH")
}

/// The response a definition produces for one request, after picking among
/// alternatives.
struct Selected<'a> {
    status: Option<u16>,
    headers: Option<BTreeMap<String, String>>,
    body: Option<&'a Value>,
}

fn select<'a>(
    definition: &'a ResponseDefinition,
    alternative: Option<&'a Value>,
) -> Selected<'a> {
    let base = Selected {
        status: definition.status,
        headers: definition.headers.clone(),
        body: definition.body.as_ref(),
    };
    let Some(alternative) = alternative else {
        return base;
    };

    // `{status, headers, body}` objects override per field; anything else is a body
    match alternative.as_object().filter(|o| o.contains_key("body")) {
        Some(object) => Selected {
            status: object
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok())
                .or(base.status),
            headers: object
                .get("headers")
                .and_then(Value::as_object)
                .map(|headers| {
                    headers
                        .iter()
                        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                        .collect()
                })
                .or(base.headers),
            body: object.get("body"),
        },
        None => Selected {
            body: Some(alternative),
            ..base
        },
    }
}

fn respond(
    status: u16,
    headers: Option<BTreeMap<String, String>>,
    body: &Value,
) -> Response<Full<Bytes>> {
    let status = status_code(status);
    match headers {
        Some(mut headers) => {
            if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                headers.extend(json_headers());
            }
            let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
            build_response_with_headers(status, headers, json)
        }
        None => json_response(status, body),
    }
}

/// Match and answer one request with an already-parsed body.
pub fn dispatch(
    shared: &ServerShared,
    method: &str,
    path: &str,
    body: &Value,
) -> Response<Full<Bytes>> {
    if method == "OPTIONS" {
        return preflight();
    }

    let table = shared.route_table();
    let Some(route) = table.find(method, path) else {
        // Reads of accumulated state are served even when only the
        // mutating route is declared
        if method == "GET" && table.find_stateful(path).is_some() {
            if let Some(log) = shared.state().snapshot(path) {
                return json_response(StatusCode::OK, &log);
            }
        }
        debug!("No mock for {} {}", method, path);
        return not_found(method, path);
    };

    debug!("Matched {} {} to route {}", method, path, route.key);
    let definition = &route.definition;

    if method == "DELETE" {
        return no_content();
    }

    if definition.stateful && is_mutation(method) {
        let template = definition.body.clone().unwrap_or_else(empty_object);
        let rendered = render_or_fallback(&template, body, shared.ids());
        let count = shared.state().append(path, rendered.clone());
        debug!("Recorded state entry {} for {}", count, path);
        return respond(
            definition.status.unwrap_or(STATEFUL_DEFAULT_STATUS),
            definition.headers.clone(),
            &rendered,
        );
    }

    if method == "GET" {
        if let Some(log) = shared.state().snapshot(path) {
            return json_response(StatusCode::OK, &log);
        }
    }

    let alternative = definition
        .alternatives
        .as_deref()
        .filter(|alternatives| !alternatives.is_empty())
        .map(|alternatives| &alternatives[rand::thread_rng().gen_range(0..alternatives.len())]);

    let selected = select(definition, alternative);
    let body = selected.body.cloned().unwrap_or_else(empty_object);
    respond(selected.status.unwrap_or(200), selected.headers, &body)
}
