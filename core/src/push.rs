//! Push notifications.

use serde::Serialize;

use crate::client::ParseClient;
use crate::outcome::ResponseOutcome;
use crate::request::to_params;

const PUSH_PATH: &str = "/1/push";

#[derive(Debug, Clone, Copy)]
pub struct Push<'a> {
    client: &'a ParseClient,
}

impl<'a> Push<'a> {
    pub(crate) fn new(client: &'a ParseClient) -> Self {
        Self { client }
    }

    /// Send a notification. `data` holds the targeting (`channels` or a
    /// `where` over installations) and the `data` payload. On success the
    /// submitted fields are merged under the server's reply.
    pub async fn send<T: Serialize + ?Sized>(&self, data: &T) -> ResponseOutcome {
        match to_params(data) {
            Ok(data) => self.client.create(PUSH_PATH.to_string(), data).await,
            Err(err) => err.into(),
        }
    }
}
