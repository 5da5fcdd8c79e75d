//! In-memory backing store for the mock service.
//!
//! # Design
//! Records of every class (including `_User` and `_Role`) are plain JSON
//! objects kept in insertion order. Operations return the exact response
//! body the service would send, or a `Failure` carrying the service's
//! `{code, error}` pair. Nothing here knows about HTTP routing.

use std::cmp::Ordering;
use std::collections::HashMap;

use axum::http::StatusCode;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

pub type Record = Map<String, Value>;

pub const USER_CLASS: &str = "_User";
pub const ROLE_CLASS: &str = "_Role";
pub const MAX_BATCH_REQUESTS: usize = 50;
const DEFAULT_LIMIT: usize = 100;
const RESERVED_FIELDS: [&str; 3] = ["objectId", "createdAt", "updatedAt"];
const KNOWN_TYPES: [&str; 6] = ["Pointer", "File", "Date", "Relation", "GeoPoint", "Bytes"];

/// Application-level error, rendered as `{"code": .., "error": ..}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub status: StatusCode,
    pub code: i64,
    pub message: String,
}

impl Failure {
    pub fn new(status: StatusCode, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: i64, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(action: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, 101, format!("object not found for {action}"))
    }

    pub fn invalid_json() -> Self {
        Self::bad_request(107, "invalid JSON")
    }

    pub fn body(&self) -> Value {
        json!({"code": self.code, "error": self.message})
    }
}

pub type StoreResult<T> = Result<T, Failure>;

/// List constraints as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
    pub keys: Option<String>,
    pub count: Option<String>,
}

/// One `{method, path, body}` entry of a batch call.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchOp {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub dimensions: Record,
    pub at: String,
}

#[derive(Debug, Default)]
pub struct Store {
    classes: HashMap<String, Vec<Record>>,
    sessions: HashMap<String, String>,
    files: HashMap<String, StoredFile>,
    events: Vec<Event>,
    pushes: Vec<Record>,
}

impl Store {
    // --- records ---

    /// Insert a record; the response is `{objectId, createdAt}` plus a
    /// `sessionToken` for new users.
    pub fn create(&mut self, class: &str, fields: Record) -> StoreResult<Record> {
        match class {
            USER_CLASS => self.check_new_user(&fields)?,
            ROLE_CLASS => self.check_new_role(&fields)?,
            _ => {}
        }

        let mut record = Record::new();
        apply_fields(&mut record, fields)?;
        let object_id = new_id();
        let now = timestamp();
        record.insert("objectId".to_string(), Value::from(object_id.clone()));
        record.insert("createdAt".to_string(), Value::from(now.clone()));
        record.insert("updatedAt".to_string(), Value::from(now.clone()));
        self.classes.entry(class.to_string()).or_default().push(record);

        let mut response = Record::new();
        response.insert("objectId".to_string(), Value::from(object_id.clone()));
        response.insert("createdAt".to_string(), Value::from(now));
        if class == USER_CLASS {
            response.insert("sessionToken".to_string(), Value::from(self.open_session(&object_id)));
        }
        Ok(response)
    }

    pub fn get(&self, class: &str, object_id: &str, keys: Option<&str>) -> StoreResult<Record> {
        self.find(class, object_id)
            .map(|record| project(public_view(record), keys))
            .ok_or_else(|| Failure::not_found("get"))
    }

    /// Apply field values and `__op` operations; the response is `{updatedAt}`.
    pub fn update(&mut self, class: &str, object_id: &str, mut fields: Record) -> StoreResult<Record> {
        let auth_data = if class == USER_CLASS {
            fields.remove("authData")
        } else {
            None
        };
        let record = self
            .find_mut(class, object_id)
            .ok_or_else(|| Failure::not_found("update"))?;

        // Validate into a scratch copy so a failing op leaves the record untouched.
        let mut updated = record.clone();
        apply_fields(&mut updated, fields)?;
        if let Some(auth_data) = auth_data {
            merge_auth_data(&mut updated, auth_data)?;
        }
        let now = timestamp();
        updated.insert("updatedAt".to_string(), Value::from(now.clone()));
        *record = updated;

        let mut response = Record::new();
        response.insert("updatedAt".to_string(), Value::from(now));
        Ok(response)
    }

    pub fn delete(&mut self, class: &str, object_id: &str) -> StoreResult<Record> {
        let records = self
            .classes
            .get_mut(class)
            .ok_or_else(|| Failure::not_found("delete"))?;
        let index = records
            .iter()
            .position(|record| object_id_of(record) == Some(object_id))
            .ok_or_else(|| Failure::not_found("delete"))?;
        records.remove(index);
        if class == USER_CLASS {
            self.sessions.retain(|_, user_id| user_id != object_id);
        }
        Ok(Record::new())
    }

    /// `{"results": [...]}`, plus `"count"` when asked for.
    pub fn query(&self, class: &str, params: &ListParams) -> StoreResult<Record> {
        let filter = match params.where_clause.as_deref() {
            Some(text) if !text.is_empty() => {
                let value: Value = serde_json::from_str(text)
                    .map_err(|_| Failure::bad_request(102, "invalid where clause"))?;
                match value {
                    Value::Object(filter) => {
                        validate_filter(&filter)?;
                        filter
                    }
                    _ => return Err(Failure::bad_request(102, "where clause must be an object")),
                }
            }
            _ => Record::new(),
        };
        let limit = parse_usize(params.limit.as_deref(), "limit")?.unwrap_or(DEFAULT_LIMIT);
        let skip = parse_usize(params.skip.as_deref(), "skip")?.unwrap_or(0);

        let mut matched: Vec<&Record> = self
            .classes
            .get(class)
            .map(|records| records.iter().filter(|record| matches(record, &filter)).collect())
            .unwrap_or_default();
        if let Some(order) = params.order.as_deref() {
            sort_records(&mut matched, order);
        }

        let results: Vec<Value> = matched
            .iter()
            .skip(skip)
            .take(limit)
            .map(|record| Value::Object(project(public_view(record), params.keys.as_deref())))
            .collect();

        let mut response = Record::new();
        response.insert("results".to_string(), Value::Array(results));
        if params.count.as_deref().is_some_and(is_truthy_flag) {
            response.insert("count".to_string(), Value::from(matched.len()));
        }
        Ok(response)
    }

    /// Run sub-requests in order; each yields `{"success": ..}` or `{"error": ..}`.
    pub fn batch(&mut self, requests: Vec<BatchOp>) -> StoreResult<Vec<Value>> {
        if requests.len() > MAX_BATCH_REQUESTS {
            return Err(Failure::bad_request(
                154,
                format!("too many operations in batch, limit is {MAX_BATCH_REQUESTS}"),
            ));
        }
        Ok(requests
            .into_iter()
            .map(|op| match self.run_batch_op(op) {
                Ok(result) => json!({"success": result}),
                Err(failure) => json!({"error": failure.body()}),
            })
            .collect())
    }

    fn run_batch_op(&mut self, op: BatchOp) -> StoreResult<Value> {
        let path = op.path.strip_prefix("/1").unwrap_or(&op.path);
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let (class, object_id) = match segments.as_slice() {
            ["classes", class] => (class.to_string(), None),
            ["classes", class, id] => (class.to_string(), Some(id.to_string())),
            ["roles"] => (ROLE_CLASS.to_string(), None),
            ["roles", id] => (ROLE_CLASS.to_string(), Some(id.to_string())),
            _ => return Err(Failure::bad_request(107, format!("unsupported batch path {}", op.path))),
        };
        let body = || match op.body.clone() {
            Some(Value::Object(fields)) => Ok(fields),
            None => Ok(Record::new()),
            Some(_) => Err(Failure::invalid_json()),
        };

        let result = match (op.method.to_ascii_uppercase().as_str(), object_id) {
            ("POST", None) => self.create(&class, body()?)?,
            ("GET", Some(id)) => self.get(&class, &id, None)?,
            ("PUT", Some(id)) => self.update(&class, &id, body()?)?,
            ("DELETE", Some(id)) => self.delete(&class, &id)?,
            (method, _) => {
                return Err(Failure::bad_request(
                    107,
                    format!("unsupported batch method {method} for {}", op.path),
                ))
            }
        };
        Ok(Value::Object(result))
    }

    fn find(&self, class: &str, object_id: &str) -> Option<&Record> {
        self.classes
            .get(class)?
            .iter()
            .find(|record| object_id_of(record) == Some(object_id))
    }

    fn find_mut(&mut self, class: &str, object_id: &str) -> Option<&mut Record> {
        self.classes
            .get_mut(class)?
            .iter_mut()
            .find(|record| object_id_of(record) == Some(object_id))
    }

    fn find_by(&self, class: &str, key: &str, value: &str) -> Option<&Record> {
        self.classes
            .get(class)?
            .iter()
            .find(|record| record.get(key).and_then(Value::as_str) == Some(value))
    }

    // --- users ---

    fn check_new_user(&self, fields: &Record) -> StoreResult<()> {
        let username = fields
            .get("username")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Failure::bad_request(200, "missing username"))?;
        fields
            .get("password")
            .and_then(Value::as_str)
            .filter(|password| !password.is_empty())
            .ok_or_else(|| Failure::bad_request(201, "missing user password"))?;
        if self.find_by(USER_CLASS, "username", username).is_some() {
            return Err(Failure::bad_request(202, format!("username {username} already taken")));
        }
        if let Some(email) = fields.get("email").and_then(Value::as_str) {
            if self.find_by(USER_CLASS, "email", email).is_some() {
                return Err(Failure::bad_request(
                    203,
                    format!("the email address {email} has already been taken"),
                ));
            }
        }
        Ok(())
    }

    pub fn log_in(&mut self, username: &str, password: &str) -> StoreResult<Record> {
        let user = self
            .find_by(USER_CLASS, "username", username)
            .filter(|user| user.get("password").and_then(Value::as_str) == Some(password))
            .map(public_view)
            .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, 101, "invalid login parameters"))?;
        Ok(self.with_new_session(user))
    }

    /// Log in by third-party identity, creating the account on first use.
    /// Returns `201` for a new account and `200` for an existing one.
    pub fn log_in_with(&mut self, auth_data: Value) -> StoreResult<(StatusCode, Record)> {
        let providers = match auth_data {
            Value::Object(providers) if !providers.is_empty() => providers,
            _ => return Err(Failure::bad_request(251, "invalid authData")),
        };
        for data in providers.values() {
            if data.get("id").and_then(Value::as_str).is_none() {
                return Err(Failure::bad_request(251, "authData entries require an id"));
            }
        }

        let existing = self.classes.get(USER_CLASS).and_then(|users| {
            users
                .iter()
                .find(|user| {
                    providers.iter().any(|(provider, data)| {
                        user.get("authData")
                            .and_then(|linked| linked.get(provider))
                            .and_then(|linked| linked.get("id"))
                            == data.get("id")
                    })
                })
                .map(public_view)
        });
        if let Some(user) = existing {
            return Ok((StatusCode::OK, self.with_new_session(user)));
        }

        let username = new_id();
        let mut fields = Record::new();
        fields.insert("authData".to_string(), Value::Object(providers));
        // Social accounts have no password; skip the sign-up checks.
        let mut record = Record::new();
        apply_fields(&mut record, fields)?;
        let object_id = new_id();
        let now = timestamp();
        record.insert("username".to_string(), Value::from(username.clone()));
        record.insert("objectId".to_string(), Value::from(object_id.clone()));
        record.insert("createdAt".to_string(), Value::from(now.clone()));
        record.insert("updatedAt".to_string(), Value::from(now.clone()));
        self.classes.entry(USER_CLASS.to_string()).or_default().push(record);

        let mut response = Record::new();
        response.insert("username".to_string(), Value::from(username));
        response.insert("objectId".to_string(), Value::from(object_id.clone()));
        response.insert("createdAt".to_string(), Value::from(now));
        response.insert("sessionToken".to_string(), Value::from(self.open_session(&object_id)));
        Ok((StatusCode::CREATED, response))
    }

    pub fn current_user(&self, session_token: Option<&str>) -> StoreResult<Record> {
        let user_id = session_token
            .and_then(|token| self.session_user(token))
            .ok_or_else(|| Failure::bad_request(209, "invalid session token"))?;
        self.get(USER_CLASS, user_id, None)
    }

    pub fn session_user(&self, session_token: &str) -> Option<&str> {
        self.sessions.get(session_token).map(String::as_str)
    }

    pub fn request_password_reset(&self, email: &str) -> StoreResult<Record> {
        self.find_by(USER_CLASS, "email", email)
            .map(|_| Record::new())
            .ok_or_else(|| Failure::bad_request(205, format!("no user found with email {email}")))
    }

    fn open_session(&mut self, user_id: &str) -> String {
        let token = format!("r:{}", Uuid::new_v4().simple());
        self.sessions.insert(token.clone(), user_id.to_string());
        token
    }

    fn with_new_session(&mut self, mut user: Record) -> Record {
        if let Some(user_id) = object_id_of(&user).map(str::to_string) {
            let token = self.open_session(&user_id);
            user.insert("sessionToken".to_string(), Value::from(token));
        }
        user
    }

    // --- roles ---

    fn check_new_role(&self, fields: &Record) -> StoreResult<()> {
        let name = fields
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Failure::bad_request(142, "role names must be specified"))?;
        if self.find_by(ROLE_CLASS, "name", name).is_some() {
            return Err(Failure::bad_request(137, format!("role name {name} already taken")));
        }
        Ok(())
    }

    // --- files ---

    /// Store a file under a unique name derived from `name`.
    pub fn put_file(&mut self, name: &str, content_type: &str, bytes: Vec<u8>) -> StoreResult<String> {
        if name.is_empty() || name == "." || name == ".." || name.chars().any(|c| c == '/' || c.is_control()) {
            return Err(Failure::bad_request(122, "filename contains invalid characters"));
        }
        let stored = format!("{}-{name}", Uuid::new_v4().simple());
        self.files.insert(
            stored.clone(),
            StoredFile {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(stored)
    }

    pub fn file(&self, name: &str) -> Option<&StoredFile> {
        self.files.get(name)
    }

    pub fn delete_file(&mut self, name: &str) -> StoreResult<()> {
        self.files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, 153, format!("file {name} not found")))
    }

    // --- analytics and push ---

    pub fn track(&mut self, name: &str, body: Record) -> StoreResult<()> {
        let dimensions = match body.get("dimensions") {
            None | Some(Value::Null) => Record::new(),
            Some(Value::Object(dimensions)) => dimensions.clone(),
            Some(_) => return Err(Failure::bad_request(111, "dimensions must be an object")),
        };
        if dimensions.values().any(|value| !value.is_string()) {
            return Err(Failure::bad_request(111, "dimension values must be strings"));
        }
        let at = body
            .get("at")
            .and_then(|at| at.get("iso").or(Some(at)))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(timestamp);
        self.events.push(Event {
            name: name.to_string(),
            dimensions,
            at,
        });
        Ok(())
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn push(&mut self, notification: Record) -> StoreResult<Record> {
        if !notification.get("data").is_some_and(Value::is_object) {
            return Err(Failure::bad_request(115, "push data is required"));
        }
        self.pushes.push(notification);
        let mut response = Record::new();
        response.insert("result".to_string(), Value::Bool(true));
        Ok(response)
    }

    pub fn pushes(&self) -> &[Record] {
        &self.pushes
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn object_id_of(record: &Record) -> Option<&str> {
    record.get("objectId").and_then(Value::as_str)
}

fn public_view(record: &Record) -> Record {
    let mut view = record.clone();
    view.remove("password");
    view
}

/// Keep only the requested keys (plus the bookkeeping fields).
fn project(record: Record, keys: Option<&str>) -> Record {
    let Some(keys) = keys.filter(|keys| !keys.is_empty()) else {
        return record;
    };
    let wanted: Vec<&str> = keys.split(',').map(str::trim).collect();
    record
        .into_iter()
        .filter(|(key, _)| RESERVED_FIELDS.contains(&key.as_str()) || wanted.contains(&key.as_str()))
        .collect()
}

fn parse_usize(value: Option<&str>, name: &str) -> StoreResult<Option<usize>> {
    value
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse()
                .map_err(|_| Failure::bad_request(102, format!("invalid {name}: {value}")))
        })
        .transpose()
}

fn is_truthy_flag(value: &str) -> bool {
    !matches!(value, "" | "0" | "false")
}

// --- field updates ---

fn apply_fields(record: &mut Record, fields: Record) -> StoreResult<()> {
    for (key, value) in fields {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        match value.get("__op").and_then(Value::as_str) {
            Some(op) => apply_op(record, &key, op, &value)?,
            None => {
                validate_value(&key, &value)?;
                record.insert(key, value);
            }
        }
    }
    Ok(())
}

fn validate_value(key: &str, value: &Value) -> StoreResult<()> {
    match value.get("__type") {
        None => Ok(()),
        Some(Value::String(kind)) if KNOWN_TYPES.contains(&kind.as_str()) => Ok(()),
        Some(_) => Err(Failure::bad_request(111, format!("invalid type for key {key}"))),
    }
}

fn apply_op(record: &mut Record, key: &str, op: &str, value: &Value) -> StoreResult<()> {
    match op {
        "Increment" => {
            let amount = value
                .get("amount")
                .filter(|amount| amount.is_number())
                .ok_or_else(|| Failure::bad_request(111, format!("invalid increment amount for key {key}")))?;
            let current = match record.get(key) {
                None | Some(Value::Null) => Value::from(0),
                Some(current) if current.is_number() => current.clone(),
                Some(_) => {
                    return Err(Failure::bad_request(111, format!("cannot increment non-number key {key}")))
                }
            };
            let sum = match (current.as_i64(), amount.as_i64()) {
                (Some(a), Some(b)) => Value::from(a + b),
                _ => Value::from(current.as_f64().unwrap_or(0.0) + amount.as_f64().unwrap_or(0.0)),
            };
            record.insert(key.to_string(), sum);
        }
        "Add" | "AddUnique" | "Remove" => {
            let objects = op_objects(key, value)?;
            let mut items = current_array(record, key)?;
            match op {
                "Add" => items.extend(objects.iter().cloned()),
                "AddUnique" => {
                    for object in objects {
                        if !items.contains(object) {
                            items.push(object.clone());
                        }
                    }
                }
                _ => items.retain(|item| !objects.contains(item)),
            }
            record.insert(key.to_string(), Value::Array(items));
        }
        "AddRelation" | "RemoveRelation" => {
            let objects = op_objects(key, value)?;
            if objects.iter().any(|object| object.get("__type") != Some(&json!("Pointer"))) {
                return Err(Failure::bad_request(111, format!("relation {key} only accepts pointers")));
            }
            let mut relation = match record.get(key) {
                None | Some(Value::Null) => json!({"__type": "Relation", "objects": []}),
                Some(existing) if existing.get("__type") == Some(&json!("Relation")) => existing.clone(),
                Some(_) => return Err(Failure::bad_request(111, format!("key {key} is not a relation"))),
            };
            if let Some(class_name) = objects.first().and_then(|pointer| pointer.get("className")) {
                relation["className"] = class_name.clone();
            }
            let mut members = relation["objects"].as_array().cloned().unwrap_or_default();
            let same = |a: &Value, b: &Value| a.get("objectId") == b.get("objectId");
            if op == "AddRelation" {
                for object in objects {
                    if !members.iter().any(|member| same(member, object)) {
                        members.push(object.clone());
                    }
                }
            } else {
                members.retain(|member| !objects.iter().any(|object| same(member, object)));
            }
            relation["objects"] = Value::Array(members);
            record.insert(key.to_string(), relation);
        }
        "Delete" => {
            record.remove(key);
        }
        other => return Err(Failure::bad_request(111, format!("unknown operation {other} for key {key}"))),
    }
    Ok(())
}

fn op_objects<'v>(key: &str, value: &'v Value) -> StoreResult<&'v Vec<Value>> {
    value
        .get("objects")
        .and_then(Value::as_array)
        .ok_or_else(|| Failure::bad_request(111, format!("operation on key {key} requires objects")))
}

fn current_array(record: &Record, key: &str) -> StoreResult<Vec<Value>> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(Failure::bad_request(111, format!("key {key} is not an array"))),
    }
}

fn merge_auth_data(record: &mut Record, auth_data: Value) -> StoreResult<()> {
    let Value::Object(providers) = auth_data else {
        return Err(Failure::bad_request(251, "invalid authData"));
    };
    let mut linked = match record.remove("authData") {
        Some(Value::Object(linked)) => linked,
        _ => Record::new(),
    };
    for (provider, data) in providers {
        if data.is_null() {
            linked.remove(&provider);
        } else {
            linked.insert(provider, data);
        }
    }
    if !linked.is_empty() {
        record.insert("authData".to_string(), Value::Object(linked));
    }
    Ok(())
}

// --- queries ---

const OPERATORS: [&str; 9] = ["$ne", "$in", "$nin", "$gt", "$gte", "$lt", "$lte", "$exists", "$all"];

fn validate_filter(filter: &Record) -> StoreResult<()> {
    for condition in filter.values() {
        if let Some(ops) = operator_map(condition) {
            if let Some(op) = ops.keys().find(|op| !OPERATORS.contains(&op.as_str())) {
                return Err(Failure::bad_request(102, format!("invalid operator {op}")));
            }
        }
    }
    Ok(())
}

/// `Some` when the condition is an operator object such as `{"$gt": 3}`.
fn operator_map(condition: &Value) -> Option<&Record> {
    condition
        .as_object()
        .filter(|ops| !ops.is_empty() && ops.keys().all(|key| key.starts_with('$')))
}

fn matches(record: &Record, filter: &Record) -> bool {
    filter.iter().all(|(key, condition)| {
        let field = record.get(key);
        match operator_map(condition) {
            Some(ops) => ops.iter().all(|(op, operand)| matches_operator(field, op, operand)),
            None => field_equals(field, condition),
        }
    })
}

fn matches_operator(field: Option<&Value>, op: &str, operand: &Value) -> bool {
    let ordered = |accept: fn(Ordering) -> bool| {
        field
            .and_then(|value| compare_values(value, operand))
            .is_some_and(accept)
    };
    match op {
        "$ne" => !field_equals(field, operand),
        "$in" => operand
            .as_array()
            .is_some_and(|options| options.iter().any(|option| field_equals(field, option))),
        "$nin" => !operand
            .as_array()
            .is_some_and(|options| options.iter().any(|option| field_equals(field, option))),
        "$all" => match (field.and_then(Value::as_array), operand.as_array()) {
            (Some(items), Some(wanted)) => wanted.iter().all(|want| items.contains(want)),
            _ => false,
        },
        "$gt" => ordered(|o| o == Ordering::Greater),
        "$gte" => ordered(|o| o != Ordering::Less),
        "$lt" => ordered(|o| o == Ordering::Less),
        "$lte" => ordered(|o| o != Ordering::Greater),
        "$exists" => field.is_some_and(|value| !value.is_null()) == operand.as_bool().unwrap_or(false),
        _ => false,
    }
}

/// Equality with array containment: `{"tags": "a"}` matches `tags: ["a", "b"]`.
fn field_equals(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Object(_), Value::Object(_)) if a.get("__type") == Some(&json!("Date")) => {
            compare_values(a.get("iso")?, b.get("iso")?)
        }
        _ => None,
    }
}

/// Sort by comma-separated keys; a `-` prefix sorts descending. Missing
/// values sort first.
fn sort_records(records: &mut [&Record], order: &str) {
    let keys: Vec<(&str, bool)> = order
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| match key.strip_prefix('-') {
            Some(key) => (key, true),
            None => (key, false),
        })
        .collect();
    records.sort_by(|a, b| {
        for (key, descending) in &keys {
            let ordering = match (a.get(*key), b.get(*key)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            };
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
