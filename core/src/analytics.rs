//! Custom analytics events.

use serde_json::{Map, Value};

use crate::client::{segment, ParseClient};
use crate::outcome::ResponseOutcome;
use crate::request::RequestSpec;

#[derive(Debug, Clone, Copy)]
pub struct Analytics<'a> {
    client: &'a ParseClient,
}

impl<'a> Analytics<'a> {
    pub(crate) fn new(client: &'a ParseClient) -> Self {
        Self { client }
    }

    pub async fn track(&self, event: &str) -> ResponseOutcome {
        self.track_with(event, std::iter::empty::<(String, String)>()).await
    }

    /// Record one occurrence of `event` segmented by string dimensions,
    /// sent as `{"dimensions": {...}}`.
    pub async fn track_with<I, K, V>(&self, event: &str, dimensions: I) -> ResponseOutcome
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let dimensions: Map<String, Value> = dimensions
            .into_iter()
            .map(|(key, value)| (key.into(), Value::String(value.into())))
            .collect();
        let spec = RequestSpec::post(format!("/1/events/{}", segment(event)))
            .param("dimensions", Value::Object(dimensions));
        self.client.execute(spec).await
    }
}
