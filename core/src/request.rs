//! Logical request description consumed by the normalizer.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};
use crate::http::HttpMethod;

/// String-keyed JSON parameters: a query for GET, a JSON body for POST/PUT.
pub type Params = Map<String, Value>;

/// One logical operation against the service.
///
/// At most one of `params` and `raw_body` is meaningful; when both are set,
/// non-empty `params` win. `headers` are merged over the credential headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub path: String,
    pub params: Option<Params>,
    pub raw_body: Option<Vec<u8>>,
    pub headers: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Params::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.raw_body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// A count-style request asks the service for `{results, count}` and must
    /// keep that envelope intact.
    pub fn is_count_request(&self) -> bool {
        self.params
            .as_ref()
            .and_then(|params| params.get("count"))
            .map(is_truthy)
            .unwrap_or(false)
    }
}

/// Render parameters as query-string pairs.
///
/// Objects and arrays become their JSON text; strings pass through verbatim;
/// numbers and booleans use their JSON spelling; null becomes empty.
pub fn flatten_params(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| {
            let flat = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.clone(), flat)
        })
        .collect()
}

/// Serialize any value that encodes to a JSON object into `Params`.
pub fn to_params<T: Serialize + ?Sized>(value: &T) -> Result<Params> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::Serialization(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
