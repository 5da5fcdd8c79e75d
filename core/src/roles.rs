//! Roles: named groups of users and child roles used for access control.

use serde::Serialize;

use crate::client::{segment, ParseClient};
use crate::outcome::ResponseOutcome;
use crate::request::{to_params, RequestSpec};
use crate::types::Query;

const ROLES_PATH: &str = "/1/roles";

#[derive(Debug, Clone, Copy)]
pub struct Roles<'a> {
    client: &'a ParseClient,
}

impl<'a> Roles<'a> {
    pub(crate) fn new(client: &'a ParseClient) -> Self {
        Self { client }
    }

    /// Create a role. `data` must carry a `name` and usually an `ACL`;
    /// `users` and `roles` relations may be seeded with `AddRelation` ops.
    pub async fn create<T: Serialize + ?Sized>(&self, data: &T) -> ResponseOutcome {
        match to_params(data) {
            Ok(data) => self.client.create(ROLES_PATH.to_string(), data).await,
            Err(err) => err.into(),
        }
    }

    pub async fn get(&self, object_id: &str) -> ResponseOutcome {
        self.client.execute(RequestSpec::get(role_path(object_id))).await
    }

    pub async fn get_with(&self, object_id: &str, query: &Query) -> ResponseOutcome {
        let spec = RequestSpec::get(role_path(object_id)).params(query.to_params());
        self.client.execute(spec).await
    }

    pub async fn update<T: Serialize + ?Sized>(&self, object_id: &str, data: &T) -> ResponseOutcome {
        match to_params(data) {
            Ok(params) => {
                self.client
                    .execute(RequestSpec::put(role_path(object_id)).params(params))
                    .await
            }
            Err(err) => err.into(),
        }
    }

    pub async fn delete(&self, object_id: &str) -> ResponseOutcome {
        self.client.execute(RequestSpec::delete(role_path(object_id))).await
    }

    pub async fn list(&self) -> ResponseOutcome {
        self.client.execute(RequestSpec::get(ROLES_PATH)).await
    }

    pub async fn list_with(&self, query: &Query) -> ResponseOutcome {
        self.client
            .execute(RequestSpec::get(ROLES_PATH).params(query.to_params()))
            .await
    }
}

fn role_path(object_id: &str) -> String {
    format!("{ROLES_PATH}/{}", segment(object_id))
}
