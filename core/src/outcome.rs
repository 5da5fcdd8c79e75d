//! The uniform result of one request/response cycle.
//!
//! # Design
//! Every call yields exactly one `ResponseOutcome` carrying the four parts a
//! caller may need: a transport/decode error, the raw response metadata, the
//! decoded body and the derived `success` flag. Application failures keep
//! their server-defined `{code, error}` body so the caller can branch on it;
//! `into_result` is the opt-in bridge to `?`-style handling.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::http::find_header;
use crate::request::Params;
use crate::types::BatchItemResult;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Raw(Vec<u8>),
}

/// Status line and headers of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseMeta {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Error-shaped body returned by the service, e.g.
/// `{"code": 101, "error": "object not found for get"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseOutcome {
    pub error: Option<ApiError>,
    pub response: Option<ResponseMeta>,
    pub body: Option<Body>,
    pub success: bool,
}

impl ResponseOutcome {
    /// Outcome for a request that never produced a response.
    pub fn failed(error: ApiError) -> Self {
        Self {
            error: Some(error),
            response: None,
            body: None,
            success: false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    /// The decoded JSON body, if the response carried one.
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            Some(Body::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// Shorthand for `json()?.get(key)`.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.json().and_then(|value| value.get(key))
    }

    /// The service's `{code, error}` body, when the outcome is an
    /// application-level failure.
    pub fn error_body(&self) -> Option<ParseErrorBody> {
        if self.success {
            return None;
        }
        self.json()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Overlay the server's creation response on the submitted fields.
    ///
    /// Server fields win on key collision. A successful reply with no body
    /// yields the submitted fields alone; any other non-object body is left
    /// untouched.
    pub fn merge_submitted(mut self, submitted: &Params) -> Self {
        if !self.success || self.error.is_some() {
            return self;
        }
        match self.body.take() {
            Some(Body::Json(Value::Object(server))) => {
                let mut merged = submitted.clone();
                merged.extend(server);
                self.body = Some(Body::Json(Value::Object(merged)));
            }
            None => self.body = Some(Body::Json(Value::Object(submitted.clone()))),
            other => self.body = other,
        }
        self
    }

    /// Per-item view of a batch response.
    pub fn batch_items(&self) -> Result<Vec<BatchItemResult>> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        let value = self
            .json()
            .ok_or_else(|| ApiError::Decode("batch response has no JSON body".to_string()))?;
        serde_json::from_value(value.clone()).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Collapse the outcome into a `Result` over the decoded body.
    pub fn into_result(self) -> Result<Body> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.success {
            return Ok(self.body.unwrap_or(Body::Raw(Vec::new())));
        }

        let status = self.response.as_ref().map(|r| r.status);
        let parsed = match &self.body {
            Some(Body::Json(value)) => serde_json::from_value::<ParseErrorBody>(value.clone()).ok(),
            _ => None,
        };
        Err(match parsed {
            Some(body) => ApiError::Parse {
                status,
                code: body.code,
                message: body.error,
            },
            None => ApiError::Parse {
                status,
                code: None,
                message: "request was not successful".to_string(),
            },
        })
    }

    /// Like `into_result`, but requires a JSON body.
    pub fn into_json(self) -> Result<Value> {
        match self.into_result()? {
            Body::Json(value) => Ok(value),
            Body::Raw(bytes) if bytes.is_empty() => Ok(Value::Null),
            Body::Raw(_) => Err(ApiError::Decode("expected a JSON response body".to_string())),
        }
    }

    /// Deserialize a successful JSON body into `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        let value = self.into_json()?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl From<ApiError> for ResponseOutcome {
    fn from(error: ApiError) -> Self {
        Self::failed(error)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn json_outcome(status: u16, body: Value, success: bool) -> ResponseOutcome {
        ResponseOutcome {
            error: None,
            response: Some(ResponseMeta {
                status,
                headers: vec![("content-type".to_string(), "application/json".to_string())],
            }),
            body: Some(Body::Json(body)),
            success,
        }
    }

    #[test]
    fn merge_submitted_server_fields_win() {
        let submitted = json!({"name": "Prince", "breed": "Pomeranian", "createdAt": "mine"});
        let outcome = json_outcome(201, json!({"objectId": "abc123", "createdAt": "T"}), true)
            .merge_submitted(submitted.as_object().unwrap());
        assert_eq!(
            outcome.json().unwrap(),
            &json!({"name": "Prince", "breed": "Pomeranian", "objectId": "abc123", "createdAt": "T"})
        );
    }

    #[test]
    fn merge_submitted_keeps_non_object_bodies() {
        let submitted = json!({"name": "Prince"});

        let mut raw = json_outcome(201, Value::Null, true);
        raw.body = Some(Body::Raw(b"created".to_vec()));
        let raw = raw.merge_submitted(submitted.as_object().unwrap());
        assert_eq!(raw.body, Some(Body::Raw(b"created".to_vec())));

        let items = json!([{"success": {"objectId": "abc123"}}]);
        let array = json_outcome(200, items.clone(), true).merge_submitted(submitted.as_object().unwrap());
        assert_eq!(array.json().unwrap(), &items);
    }

    #[test]
    fn merge_submitted_fills_empty_success_body() {
        let submitted = json!({"name": "Prince"});
        let mut outcome = json_outcome(201, Value::Null, true);
        outcome.body = None;
        let outcome = outcome.merge_submitted(submitted.as_object().unwrap());
        assert_eq!(outcome.json().unwrap(), &submitted);
    }

    #[test]
    fn merge_submitted_skips_failures() {
        let submitted = json!({"name": "Ling"});
        let outcome = json_outcome(400, json!({"code": 201, "error": "missing user password"}), false)
            .merge_submitted(submitted.as_object().unwrap());
        assert!(outcome.field("name").is_none());
        assert_eq!(outcome.field("code").unwrap(), 201);
    }

    #[test]
    fn error_body_only_for_failures() {
        let ok = json_outcome(200, json!({"error": "ignored"}), true);
        assert!(ok.error_body().is_none());

        let failed = json_outcome(404, json!({"code": 101, "error": "object not found for get"}), false);
        let body = failed.error_body().unwrap();
        assert_eq!(body.code, Some(101));
        assert_eq!(body.error, "object not found for get");
    }

    #[test]
    fn into_result_maps_application_failure() {
        let failed = json_outcome(404, json!({"code": 101, "error": "object not found for get"}), false);
        let err = failed.into_result().unwrap_err();
        assert_eq!(
            err,
            ApiError::Parse {
                status: Some(404),
                code: Some(101),
                message: "object not found for get".to_string(),
            }
        );
    }

    #[test]
    fn into_result_prefers_transport_error() {
        let err = ApiError::Transport {
            kind: crate::error::TransportErrorKind::Connect,
            message: "refused".to_string(),
        };
        let outcome = ResponseOutcome::failed(err.clone());
        assert!(!outcome.success);
        assert_eq!(outcome.into_result().unwrap_err(), err);
    }

    #[test]
    fn into_typed_deserializes() {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Created {
            object_id: String,
        }
        let created: Created = json_outcome(201, json!({"objectId": "abc"}), true)
            .into_typed()
            .unwrap();
        assert_eq!(created.object_id, "abc");
    }

    #[test]
    fn batch_items_are_typed() {
        let outcome = json_outcome(
            200,
            json!([
                {"success": {"objectId": "a1", "createdAt": "T"}},
                {"error": {"code": 101, "error": "object not found for update"}}
            ]),
            true,
        );
        let items = outcome.batch_items().unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], BatchItemResult::Success(v) if v["objectId"] == "a1"));
        assert!(matches!(&items[1], BatchItemResult::Error(e) if e.code == Some(101)));
    }
}
