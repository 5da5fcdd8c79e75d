//! Client handle tying configuration, normalizer and transport together.
//!
//! # Design
//! `ParseClient` is cheap to clone: it holds the immutable configuration and
//! the transport behind `Arc`s. Credential changes produce a new handle that
//! shares the transport, so requests already in flight keep the credentials
//! they were built with.
//!
//! The sans-IO halves stay public (`build_request` / `parse_response`) for
//! hosts that want to run the HTTP round-trip themselves.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::analytics::Analytics;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::files::Files;
use crate::http::{HttpRequest, HttpResponse};
use crate::normalizer::{build_request, classify_response, classify_transport_failure};
use crate::objects::Objects;
use crate::outcome::ResponseOutcome;
use crate::push::Push;
use crate::request::{Params, RequestSpec};
use crate::roles::Roles;
use crate::transport::{ReqwestTransport, Transport};
use crate::users::Users;

#[derive(Debug, Clone)]
pub struct ParseClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl ParseClient {
    /// Client over the default `reqwest` transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A handle acting as the user identified by `token`.
    pub fn with_session_token(&self, token: impl Into<String>) -> Self {
        self.reconfigured(|config| config.with_session_token(token))
    }

    pub fn without_session_token(&self) -> Self {
        self.reconfigured(ClientConfig::without_session_token)
    }

    /// A handle that bypasses access control with the master key.
    pub fn with_master_key(&self, master_key: impl Into<String>) -> Self {
        self.reconfigured(|config| config.with_master_key(master_key))
    }

    pub fn without_master_key(&self) -> Self {
        self.reconfigured(ClientConfig::without_master_key)
    }

    fn reconfigured(&self, change: impl FnOnce(ClientConfig) -> ClientConfig) -> Self {
        Self {
            config: Arc::new(change((*self.config).clone())),
            transport: Arc::clone(&self.transport),
        }
    }

    pub fn build_request(&self, spec: &RequestSpec) -> Result<HttpRequest> {
        build_request(spec, &self.config)
    }

    pub fn parse_response(&self, spec: &RequestSpec, response: HttpResponse) -> ResponseOutcome {
        classify_response(spec, response)
    }

    /// Run one request/response cycle. Always yields exactly one outcome.
    #[instrument(skip_all, fields(method = %spec.method, path = %spec.path))]
    pub async fn execute(&self, spec: RequestSpec) -> ResponseOutcome {
        let request = match self.build_request(&spec) {
            Ok(request) => request,
            Err(err) => return ResponseOutcome::failed(err),
        };
        match self.transport.send(request).await {
            Ok(response) => {
                let outcome = self.parse_response(&spec, response);
                debug!(status = ?outcome.status(), success = outcome.success, "request completed");
                outcome
            }
            Err(err) => {
                debug!(error = %err, "transport failed");
                classify_transport_failure(err)
            }
        }
    }

    /// POST `data` to `path` and, on success, merge it under the server's
    /// creation response.
    pub(crate) async fn create(&self, path: String, data: Params) -> ResponseOutcome {
        let outcome = self.execute(RequestSpec::post(path).params(data.clone())).await;
        outcome.merge_submitted(&data)
    }

    pub fn users(&self) -> Users<'_> {
        Users::new(self)
    }

    pub fn objects(&self, class_name: impl Into<String>) -> Objects<'_> {
        Objects::new(self, class_name)
    }

    pub fn roles(&self) -> Roles<'_> {
        Roles::new(self)
    }

    pub fn files(&self) -> Files<'_> {
        Files::new(self)
    }

    pub fn analytics(&self) -> Analytics<'_> {
        Analytics::new(self)
    }

    pub fn push(&self) -> Push<'_> {
        Push::new(self)
    }
}

/// Percent-encode one caller-supplied path segment.
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
