use super::document::Document;
use super::http::HttpMedium;
use super::medium::{FileMedium, Medium};
use super::store::UserStore;
use crate::core::{GokiError, Result, User};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// `user_id -> User`, persisted as one JSON object.
type UserMap = HashMap<String, User>;

/// Users kept in one JSON document on a [`Medium`].
///
/// Only one process may open a given medium at a time.
#[derive(Debug)]
pub struct JsonUserStore<M> {
    document: Document<M, UserMap>,
}

pub type FileUserStore = JsonUserStore<FileMedium>;
pub type RemoteUserStore = JsonUserStore<HttpMedium>;

impl<M: Medium> JsonUserStore<M> {
    pub async fn open(medium: M) -> Result<Self> {
        Ok(Self {
            document: Document::open("user", medium).await?,
        })
    }
}

#[async_trait]
impl<M: Medium> UserStore for JsonUserStore<M> {
    async fn get(&self, user_id: &str) -> Result<User> {
        self.document
            .read(|users| users.get(user_id).cloned())
            .await
            .ok_or_else(|| GokiError::UserNotFound(user_id.to_string()))
    }

    async fn get_by_external_id(&self, external_id: &str) -> Result<User> {
        self.document
            .read(|users| {
                users
                    .values()
                    .find(|user| user.external_id() == external_id)
                    .cloned()
            })
            .await
            .ok_or_else(|| GokiError::UserNotFound(format!("external id {}", external_id)))
    }

    async fn add(&self, user: &User) -> Result<()> {
        self.document
            .update(|users| {
                if users.contains_key(user.id()) {
                    return Err(GokiError::UserAlreadyExists(format!("id '{}'", user.id())));
                }
                if users.values().any(|u| u.external_id() == user.external_id()) {
                    return Err(GokiError::UserAlreadyExists(format!(
                        "external id '{}'",
                        user.external_id()
                    )));
                }
                let stored = User::new(user.id(), user.name(), user.external_id());
                users.insert(stored.id().to_string(), stored);
                Ok(())
            })
            .await?;

        debug!(user_id = %user.id(), "user added");
        Ok(())
    }

    async fn count(&self) -> usize {
        self.document.read(|users| users.len()).await
    }

    async fn close(&self) -> Result<()> {
        self.document.close().await
    }
}
