//! Accounts: sign-up, login, session validation and social identities.

use serde::Serialize;

use crate::client::{segment, ParseClient};
use crate::outcome::ResponseOutcome;
use crate::request::{to_params, RequestSpec};
use crate::types::{AuthData, Query};

const USERS_PATH: &str = "/1/users";

#[derive(Debug, Clone, Copy)]
pub struct Users<'a> {
    client: &'a ParseClient,
}

impl<'a> Users<'a> {
    pub(crate) fn new(client: &'a ParseClient) -> Self {
        Self { client }
    }

    /// Create an account. On success the outcome holds the submitted fields
    /// overlaid with `objectId`, `createdAt` and `sessionToken`.
    pub async fn sign_up<T: Serialize + ?Sized>(&self, user: &T) -> ResponseOutcome {
        match to_params(user) {
            Ok(data) => self.client.create(USERS_PATH.to_string(), data).await,
            Err(err) => err.into(),
        }
    }

    /// Authenticate with username and password (sent as query parameters).
    pub async fn log_in(&self, username: &str, password: &str) -> ResponseOutcome {
        let spec = RequestSpec::get("/1/login")
            .param("username", username)
            .param("password", password);
        self.client.execute(spec).await
    }

    pub async fn get(&self, object_id: &str) -> ResponseOutcome {
        self.client.execute(RequestSpec::get(user_path(object_id))).await
    }

    pub async fn get_with(&self, object_id: &str, query: &Query) -> ResponseOutcome {
        let spec = RequestSpec::get(user_path(object_id)).params(query.to_params());
        self.client.execute(spec).await
    }

    /// The user owning the client's session token. Doubles as session
    /// validation: an invalid token yields a failed outcome.
    pub async fn current(&self) -> ResponseOutcome {
        self.client.execute(RequestSpec::get("/1/users/me")).await
    }

    pub async fn update<T: Serialize + ?Sized>(&self, object_id: &str, data: &T) -> ResponseOutcome {
        match to_params(data) {
            Ok(params) => {
                let spec = RequestSpec::put(user_path(object_id)).params(params);
                self.client.execute(spec).await
            }
            Err(err) => err.into(),
        }
    }

    pub async fn delete(&self, object_id: &str) -> ResponseOutcome {
        self.client.execute(RequestSpec::delete(user_path(object_id))).await
    }

    pub async fn list(&self) -> ResponseOutcome {
        self.client.execute(RequestSpec::get(USERS_PATH)).await
    }

    pub async fn list_with(&self, query: &Query) -> ResponseOutcome {
        self.client
            .execute(RequestSpec::get(USERS_PATH).params(query.to_params()))
            .await
    }

    pub async fn request_password_reset(&self, email: &str) -> ResponseOutcome {
        let spec = RequestSpec::post("/1/requestPasswordReset").param("email", email);
        self.client.execute(spec).await
    }

    /// Sign up or log in through a third-party identity provider.
    pub async fn log_in_with(&self, auth_data: &AuthData) -> ResponseOutcome {
        let spec = RequestSpec::post(USERS_PATH).param("authData", auth_data.clone().into_value());
        self.client.execute(spec).await
    }

    /// Attach a provider identity to an existing account. Requires the
    /// account's session token (or the master key).
    pub async fn link(&self, object_id: &str, auth_data: &AuthData) -> ResponseOutcome {
        let spec = RequestSpec::put(user_path(object_id))
            .param("authData", auth_data.clone().into_value());
        self.client.execute(spec).await
    }

    pub async fn unlink(&self, object_id: &str, provider: &str) -> ResponseOutcome {
        let spec =
            RequestSpec::put(user_path(object_id)).param("authData", AuthData::unlink(provider).into_value());
        self.client.execute(spec).await
    }
}

fn user_path(object_id: &str) -> String {
    format!("{USERS_PATH}/{}", segment(object_id))
}
