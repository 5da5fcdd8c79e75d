//! Typed payload vocabulary.
//!
//! # Design
//! The service overloads JSON objects with reserved keys: `__type` marks a
//! typed reference (`Pointer`, `File`) and `__op` asks the server to mutate a
//! field in place instead of replacing it. These types render to exactly
//! those wire shapes through serde, so callers never assemble sentinel keys
//! by hand. They can be embedded anywhere a record field value is expected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::Result;
use crate::http::HttpMethod;
use crate::outcome::ParseErrorBody;
use crate::request::Params;

/// Reference to another record: `{"__type":"Pointer","className","objectId"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__type", rename = "Pointer", rename_all = "camelCase")]
pub struct Pointer {
    pub class_name: String,
    pub object_id: String,
}

impl Pointer {
    pub fn new(class_name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            object_id: object_id.into(),
        }
    }
}

/// Reference to an uploaded file: `{"__type":"File","name"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__type", rename = "File")]
pub struct FileRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FileRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }
}

/// Server-side field mutation: `{"__op": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__op")]
pub enum FieldOp {
    /// Atomic counter change; negative amounts decrement. Fractional
    /// amounts are allowed.
    Increment { amount: Number },
    /// Append to an array field.
    Add { objects: Vec<Value> },
    /// Append values not already present.
    AddUnique { objects: Vec<Value> },
    /// Remove every occurrence of the given values.
    Remove { objects: Vec<Value> },
    AddRelation { objects: Vec<Pointer> },
    RemoveRelation { objects: Vec<Pointer> },
}

impl FieldOp {
    pub fn increment(amount: impl Into<Number>) -> Self {
        Self::Increment { amount: amount.into() }
    }

    /// Wrap the operation as a single-field update body.
    pub fn on_field(&self, field: impl Into<String>) -> Result<Params> {
        let mut params = Params::new();
        params.insert(field.into(), serde_json::to_value(self)?);
        Ok(params)
    }
}

/// Query constraints for list operations.
///
/// `where` is an opaque filter expression forwarded to the service; `order`
/// takes a field name, `-` prefixed for descending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub where_clause: Option<Value>,
    pub order: Option<String>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub keys: Option<String>,
    pub include: Option<String>,
    pub count: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, where_clause: Value) -> Self {
        self.where_clause = Some(where_clause);
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn keys(mut self, keys: impl Into<String>) -> Self {
        self.keys = Some(keys.into());
        self
    }

    pub fn include(mut self, include: impl Into<String>) -> Self {
        self.include = Some(include.into());
        self
    }

    /// Ask for `{results, count}` instead of a bare result list.
    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(where_clause) = &self.where_clause {
            params.insert("where".to_string(), where_clause.clone());
        }
        if let Some(order) = &self.order {
            params.insert("order".to_string(), Value::from(order.as_str()));
        }
        if let Some(limit) = self.limit {
            params.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(skip) = self.skip {
            params.insert("skip".to_string(), Value::from(skip));
        }
        if let Some(keys) = &self.keys {
            params.insert("keys".to_string(), Value::from(keys.as_str()));
        }
        if let Some(include) = &self.include {
            params.insert("include".to_string(), Value::from(include.as_str()));
        }
        if self.count {
            params.insert("count".to_string(), Value::from(1));
        }
        params
    }
}

/// One sub-request of a `/1/batch` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub method: HttpMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Per-item result of a batch call: `{"success": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchItemResult {
    Success(Value),
    Error(ParseErrorBody),
}

/// Third-party identity data keyed by provider name, e.g.
/// `{"facebook": {"id": ..., "access_token": ..., "expiration_date": ...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthData(Map<String, Value>);

impl AuthData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, name: impl Into<String>, data: Value) -> Self {
        self.0.insert(name.into(), data);
        self
    }

    /// Provider entry set to null, which the service reads as "unlink".
    pub fn unlink(name: impl Into<String>) -> Self {
        Self::new().provider(name, Value::Null)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
