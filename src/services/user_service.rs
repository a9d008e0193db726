use tracing::info;
use uuid::Uuid;

use crate::database::patch::Patch;
use crate::database::repository::{timestamp, UserRepository};
use crate::database::store::Store;
use crate::domain::entities::{validate_username, NewUser, User};
use crate::error::Result;
use crate::filter::ListQuery;

/// Account records. Credentials arrive already hashed.
pub struct UserService<S> {
    users: UserRepository<S>,
}

impl<S: Store> UserService<S> {
    pub fn new(store: S) -> Self {
        Self {
            users: UserRepository::new(store),
        }
    }

    /// Create an account. A taken username or email is a `SaveConflict`,
    /// raised by the store's unique constraints.
    pub async fn register(&self, draft: NewUser) -> Result<User> {
        let user = self.users.create(&draft).await?;
        info!(user_id = %user.id, "Registered user '{}'", user.username);
        Ok(user)
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User> {
        Ok(self.users.get(user_id).await?)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        validate_username(username)?;
        let mut found = self
            .users
            .get_multi(&ListQuery::new().filter("username", username).limit(1))
            .await?;
        Ok(found.pop())
    }

    pub async fn record_login(&self, user_id: Uuid) -> Result<User> {
        let patch = Patch::new().set("last_login", timestamp());
        Ok(self.users.update(user_id, &patch).await?)
    }

    pub async fn change_password(&self, user_id: Uuid, password_hash: impl Into<String>) -> Result<User> {
        let patch = Patch::new()
            .set("password_hash", password_hash.into())
            .set("last_password_change", timestamp());
        Ok(self.users.update(user_id, &patch).await?)
    }
}
