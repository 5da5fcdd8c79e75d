//! Records of one class: CRUD, queries, counts, field operations and batches.

use serde::Serialize;
use serde_json::{Number, Value};

use crate::client::{segment, ParseClient};
use crate::error::Result;
use crate::http::HttpMethod;
use crate::outcome::ResponseOutcome;
use crate::request::{to_params, Params, RequestSpec};
use crate::types::{BatchRequest, FieldOp, Pointer, Query};

const BATCH_PATH: &str = "/1/batch";

#[derive(Debug, Clone)]
pub struct Objects<'a> {
    client: &'a ParseClient,
    class_name: String,
}

impl<'a> Objects<'a> {
    pub(crate) fn new(client: &'a ParseClient, class_name: impl Into<String>) -> Self {
        Self {
            client,
            class_name: class_name.into(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Server-relative path of the class, as used inside batch requests.
    pub fn class_path(&self) -> String {
        format!("/1/classes/{}", segment(&self.class_name))
    }

    pub fn object_path(&self, object_id: &str) -> String {
        format!("{}/{}", self.class_path(), segment(object_id))
    }

    /// Create a record. On success the outcome holds the submitted fields
    /// overlaid with `objectId` and `createdAt`.
    pub async fn create<T: Serialize + ?Sized>(&self, data: &T) -> ResponseOutcome {
        match to_params(data) {
            Ok(data) => self.client.create(self.class_path(), data).await,
            Err(err) => err.into(),
        }
    }

    pub async fn get(&self, object_id: &str) -> ResponseOutcome {
        self.client.execute(RequestSpec::get(self.object_path(object_id))).await
    }

    pub async fn get_with(&self, object_id: &str, query: &Query) -> ResponseOutcome {
        let spec = RequestSpec::get(self.object_path(object_id)).params(query.to_params());
        self.client.execute(spec).await
    }

    pub async fn update<T: Serialize + ?Sized>(&self, object_id: &str, data: &T) -> ResponseOutcome {
        match to_params(data) {
            Ok(params) => self.put(object_id, params).await,
            Err(err) => err.into(),
        }
    }

    pub async fn delete(&self, object_id: &str) -> ResponseOutcome {
        self.client.execute(RequestSpec::delete(self.object_path(object_id))).await
    }

    /// Every record of the class (subject to the service's default limit).
    pub async fn query(&self) -> ResponseOutcome {
        self.client.execute(RequestSpec::get(self.class_path())).await
    }

    pub async fn query_with(&self, query: &Query) -> ResponseOutcome {
        let spec = RequestSpec::get(self.class_path()).params(query.to_params());
        self.client.execute(spec).await
    }

    /// Number of records, as `{"results": [], "count": n}`.
    pub async fn count(&self) -> ResponseOutcome {
        self.count_with(&Query::new()).await
    }

    pub async fn count_with(&self, query: &Query) -> ResponseOutcome {
        let mut params = query.to_params();
        params.insert("count".to_string(), Value::from(1));
        params.insert("limit".to_string(), Value::from(0));
        self.client
            .execute(RequestSpec::get(self.class_path()).params(params))
            .await
    }

    /// Apply a server-side operation to one field.
    pub async fn apply(&self, object_id: &str, field: &str, op: FieldOp) -> ResponseOutcome {
        match op.on_field(field) {
            Ok(params) => self.put(object_id, params).await,
            Err(err) => err.into(),
        }
    }

    /// Atomic counter change; takes any JSON number, e.g. `3`, `-1` or a
    /// `Number::from_f64(0.5)`.
    pub async fn increment(&self, object_id: &str, field: &str, amount: impl Into<Number>) -> ResponseOutcome {
        self.apply(object_id, field, FieldOp::increment(amount)).await
    }

    pub async fn add(&self, object_id: &str, field: &str, objects: Vec<Value>) -> ResponseOutcome {
        self.apply(object_id, field, FieldOp::Add { objects }).await
    }

    pub async fn add_unique(&self, object_id: &str, field: &str, objects: Vec<Value>) -> ResponseOutcome {
        self.apply(object_id, field, FieldOp::AddUnique { objects }).await
    }

    pub async fn remove(&self, object_id: &str, field: &str, objects: Vec<Value>) -> ResponseOutcome {
        self.apply(object_id, field, FieldOp::Remove { objects }).await
    }

    pub async fn add_relation(&self, object_id: &str, field: &str, objects: Vec<Pointer>) -> ResponseOutcome {
        self.apply(object_id, field, FieldOp::AddRelation { objects }).await
    }

    pub async fn remove_relation(
        &self,
        object_id: &str,
        field: &str,
        objects: Vec<Pointer>,
    ) -> ResponseOutcome {
        self.apply(object_id, field, FieldOp::RemoveRelation { objects }).await
    }

    /// Create several records in one `/1/batch` call. The outcome body is the
    /// server's per-item array; see `ResponseOutcome::batch_items`.
    pub async fn create_many<T: Serialize>(&self, items: &[T]) -> ResponseOutcome {
        let requests = items
            .iter()
            .map(|item| -> Result<BatchRequest> {
                Ok(BatchRequest {
                    method: HttpMethod::Post,
                    path: self.class_path(),
                    body: Some(Value::Object(to_params(item)?)),
                })
            })
            .collect::<Result<Vec<_>>>();
        match requests {
            Ok(requests) => self.batch(requests).await,
            Err(err) => err.into(),
        }
    }

    /// Update several records, given as `(objectId, fields)` pairs.
    pub async fn update_many<S: AsRef<str>, T: Serialize>(&self, updates: &[(S, T)]) -> ResponseOutcome {
        let requests = updates
            .iter()
            .map(|(object_id, data)| -> Result<BatchRequest> {
                Ok(BatchRequest {
                    method: HttpMethod::Put,
                    path: self.object_path(object_id.as_ref()),
                    body: Some(Value::Object(to_params(data)?)),
                })
            })
            .collect::<Result<Vec<_>>>();
        match requests {
            Ok(requests) => self.batch(requests).await,
            Err(err) => err.into(),
        }
    }

    pub async fn delete_many<S: AsRef<str>>(&self, object_ids: &[S]) -> ResponseOutcome {
        let requests = object_ids
            .iter()
            .map(|object_id| BatchRequest {
                method: HttpMethod::Delete,
                path: self.object_path(object_id.as_ref()),
                body: None,
            })
            .collect();
        self.batch(requests).await
    }

    /// Send arbitrary sub-requests as one batch.
    pub async fn batch(&self, requests: Vec<BatchRequest>) -> ResponseOutcome {
        let requests = match serde_json::to_value(requests) {
            Ok(value) => value,
            Err(err) => return ResponseOutcome::failed(err.into()),
        };
        let spec = RequestSpec::post(BATCH_PATH).param("requests", requests);
        self.client.execute(spec).await
    }

    async fn put(&self, object_id: &str, params: Params) -> ResponseOutcome {
        self.client
            .execute(RequestSpec::put(self.object_path(object_id)).params(params))
            .await
    }
}
