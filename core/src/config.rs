//! Client-wide credentials and endpoint configuration.
//!
//! # Design
//! `ClientConfig` is an immutable value once handed to a `ParseClient`.
//! Switching identity (session token) or escalating privilege (master key)
//! yields a new client handle rather than mutating shared state, so a
//! request always carries the credentials that were current when its handle
//! was created.

use std::fmt;
use std::time::Duration;

use crate::error::{ApiError, Result};

/// Origin of the hosted service. Every request path is relative to it.
pub const DEFAULT_BASE_URL: &str = "https://api.parse.com";

pub const APPLICATION_ID_HEADER: &str = "X-Parse-Application-Id";
pub const REST_API_KEY_HEADER: &str = "X-Parse-REST-API-Key";
pub const SESSION_TOKEN_HEADER: &str = "X-Parse-Session-Token";
pub const MASTER_KEY_HEADER: &str = "X-Parse-Master-Key";

pub const ENV_APPLICATION_ID: &str = "PARSE_APPLICATION_ID";
pub const ENV_REST_API_KEY: &str = "PARSE_REST_API_KEY";
pub const ENV_MASTER_KEY: &str = "PARSE_MASTER_KEY";
pub const ENV_SESSION_TOKEN: &str = "PARSE_SESSION_TOKEN";
pub const ENV_BASE_URL: &str = "PARSE_BASE_URL";

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    application_id: String,
    rest_api_key: String,
    master_key: Option<String>,
    session_token: Option<String>,
    timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(application_id: impl Into<String>, rest_api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            application_id: application_id.into(),
            rest_api_key: rest_api_key.into(),
            master_key: None,
            session_token: None,
            timeout: None,
        }
    }

    /// Read configuration from `PARSE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let application_id = get(ENV_APPLICATION_ID)
            .ok_or_else(|| ApiError::Config(format!("{ENV_APPLICATION_ID} is not set")))?;
        let rest_api_key = get(ENV_REST_API_KEY)
            .ok_or_else(|| ApiError::Config(format!("{ENV_REST_API_KEY} is not set")))?;

        let mut config = Self::new(application_id, rest_api_key);
        if let Some(base_url) = get(ENV_BASE_URL) {
            config = config.with_base_url(base_url);
        }
        config.master_key = get(ENV_MASTER_KEY);
        config.session_token = get(ENV_SESSION_TOKEN);
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_master_key(mut self, master_key: impl Into<String>) -> Self {
        self.master_key = Some(master_key.into());
        self
    }

    pub fn without_master_key(mut self) -> Self {
        self.master_key = None;
        self
    }

    pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
        self.session_token = Some(session_token.into());
        self
    }

    pub fn without_session_token(mut self) -> Self {
        self.session_token = None;
        self
    }

    /// Overall request timeout handed to the transport. Unset means the
    /// transport's own default applies.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn rest_api_key(&self) -> &str {
        &self.rest_api_key
    }

    pub fn master_key(&self) -> Option<&str> {
        self.master_key.as_deref()
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

// Secrets stay out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("application_id", &self.application_id)
            .field("rest_api_key", &"<redacted>")
            .field("master_key", &redact(&self.master_key))
            .field("session_token", &redact(&self.session_token))
            .field("timeout", &self.timeout)
            .finish()
    }
}
