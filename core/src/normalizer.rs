//! Request normalization and response classification.
//!
//! # Design
//! Both halves are pure functions. `build_request` turns a `RequestSpec` and
//! the client credentials into a transport-ready `HttpRequest`;
//! `classify_response` turns whatever came back into a `ResponseOutcome`.
//! Nothing here retries, recovers or performs I/O.
//!
//! Payload placement:
//! - non-empty `params` on GET become the query string, with object/array
//!   values JSON-stringified;
//! - non-empty `params` on POST/PUT become a JSON body, unflattened;
//! - non-empty `params` on DELETE are dropped (no payload);
//! - otherwise `raw_body`, if any, is sent verbatim.
//!
//! Classification: 200/201 is provisionally a success; a JSON body with a
//! truthy `error` field forces failure; otherwise a `results` array is
//! unwrapped unless the request was count-style.

use serde_json::Value;
use tracing::warn;

use crate::config::{
    ClientConfig, APPLICATION_ID_HEADER, MASTER_KEY_HEADER, REST_API_KEY_HEADER,
    SESSION_TOKEN_HEADER,
};
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::outcome::{Body, ResponseMeta, ResponseOutcome};
use crate::request::{flatten_params, is_truthy, RequestSpec};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Build the HTTP request for `spec` using the credentials in `config`.
pub fn build_request(spec: &RequestSpec, config: &ClientConfig) -> Result<HttpRequest> {
    if !spec.path.starts_with('/') {
        return Err(ApiError::Config(format!(
            "request path must start with '/': {}",
            spec.path
        )));
    }

    let mut headers = vec![
        (APPLICATION_ID_HEADER.to_string(), config.application_id().to_string()),
        (REST_API_KEY_HEADER.to_string(), config.rest_api_key().to_string()),
    ];
    if let Some(token) = config.session_token() {
        headers.push((SESSION_TOKEN_HEADER.to_string(), token.to_string()));
    }
    if let Some(master_key) = config.master_key() {
        headers.push((MASTER_KEY_HEADER.to_string(), master_key.to_string()));
    }

    let mut query = Vec::new();
    let mut body = None;
    match spec.params.as_ref().filter(|params| !params.is_empty()) {
        Some(params) => match spec.method {
            HttpMethod::Get => query = flatten_params(params),
            HttpMethod::Post | HttpMethod::Put => {
                body = Some(serde_json::to_vec(params)?);
                set_header(&mut headers, "Content-Type", JSON_CONTENT_TYPE);
            }
            HttpMethod::Delete => {
                warn!(path = %spec.path, "parameters on a DELETE request are not sent");
            }
        },
        None => body = spec.raw_body.clone(),
    }

    for (name, value) in &spec.headers {
        set_header(&mut headers, name, value);
    }

    Ok(HttpRequest {
        method: spec.method,
        url: format!("{}{}", config.base_url(), spec.path),
        query,
        headers,
        body,
    })
}

/// Classify a received response for the request described by `spec`.
pub fn classify_response(spec: &RequestSpec, response: HttpResponse) -> ResponseOutcome {
    let mut success = matches!(response.status, 200 | 201);
    let is_json = response.is_json();
    let meta = ResponseMeta {
        status: response.status,
        headers: response.headers,
    };
    let bytes = response.body;

    if bytes.is_empty() {
        return ResponseOutcome {
            error: None,
            response: Some(meta),
            body: None,
            success,
        };
    }

    if !is_json {
        return ResponseOutcome {
            error: None,
            response: Some(meta),
            body: Some(Body::Raw(bytes)),
            success,
        };
    }

    let mut value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            return ResponseOutcome {
                error: Some(ApiError::Decode(err.to_string())),
                response: Some(meta),
                body: Some(Body::Raw(bytes)),
                success: false,
            };
        }
    };

    if value.get("error").map(is_truthy).unwrap_or(false) {
        success = false;
    } else if !spec.is_count_request() && matches!(value.get("results"), Some(Value::Array(_))) {
        value = value["results"].take();
    }

    ResponseOutcome {
        error: None,
        response: Some(meta),
        body: Some(Body::Json(value)),
        success,
    }
}

/// Outcome for a request whose transport failed before any response.
pub fn classify_transport_failure(error: ApiError) -> ResponseOutcome {
    ResponseOutcome::failed(error)
}

/// Last-write-wins, case-insensitive header assignment.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
        Some(slot) => *slot = (name.to_string(), value.to_string()),
        None => headers.push((name.to_string(), value.to_string())),
    }
}
