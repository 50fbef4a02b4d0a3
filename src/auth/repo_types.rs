use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::password;

/// Provider tag written for email/password accounts.
pub const LOCAL_PROVIDER: &str = "local";

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String, // bcrypt hash
    pub group_id: Uuid,
    pub provider: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    /// Plaintext waiting to be hashed on the next save. `Some` means the
    /// password is dirty.
    #[sqlx(skip)]
    pending_password: Option<String>,
}

impl User {
    /// A not-yet-persisted user whose password will be hashed on first save.
    pub fn new(email: String, password: String, group_id: Uuid, provider: &str) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash: String::new(),
            group_id,
            provider: provider.to_owned(),
            created_at: now,
            updated_at: now,
            pending_password: Some(password),
        }
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.pending_password = Some(password.into());
    }

    pub fn password_modified(&self) -> bool {
        self.pending_password.is_some()
    }

    pub(crate) fn take_pending_password(&mut self) -> Option<String> {
        self.pending_password.take()
    }

    /// Compares a candidate password with the stored hash.
    pub async fn match_password(&self, candidate: &str) -> bool {
        password::verify_password(candidate, &self.password_hash).await
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub group: Uuid,
    pub provider: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            group: u.group_id,
            provider: u.provider,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
