//! Async client core for a Parse-style REST backend.
//!
//! # Overview
//! Every operation (sign-up, record CRUD, queries, batches, file upload,
//! analytics, push) reduces to one `RequestSpec` handed to the request
//! normalizer, which builds the `HttpRequest`, dispatches it through a
//! `Transport`, and classifies the `HttpResponse` into a `ResponseOutcome`.
//!
//! # Design
//! - `normalizer` is pure: `build_request` and `classify_response` never
//!   touch the network, so hosts can run the round-trip themselves and tests
//!   can drive the classification from JSON vectors.
//! - `ParseClient` owns an immutable `Arc<ClientConfig>`; credential changes
//!   return a new handle instead of mutating shared state.
//! - Façades (`users`, `objects`, `roles`, `files`, `analytics`, `push`) only
//!   map arguments onto paths and payloads.
//! - Application failures are data (`success == false` with the service's
//!   `{code, error}` body); only transport, decode and local build failures
//!   populate `ResponseOutcome::error`.

pub mod analytics;
pub mod client;
pub mod config;
pub mod error;
pub mod files;
pub mod http;
pub mod normalizer;
pub mod objects;
pub mod outcome;
pub mod push;
pub mod request;
pub mod roles;
pub mod transport;
pub mod types;
pub mod users;

pub use client::ParseClient;
pub use config::ClientConfig;
pub use error::{ApiError, Result, TransportErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use outcome::{Body, ParseErrorBody, ResponseMeta, ResponseOutcome};
pub use request::{Params, RequestSpec};
pub use transport::{ReqwestTransport, Transport};
pub use types::{AuthData, BatchItemResult, BatchRequest, FieldOp, FileRef, Pointer, Query};
