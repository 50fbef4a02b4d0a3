use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::{debug, error};
use uuid::Uuid;

use super::{password, repo_types::User};
use crate::error::{AuthError, StoreError};

/// Persistence for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Inserts or updates by id and returns the row as stored. Writes
    /// `password_hash` verbatim.
    async fn save(&self, user: &User) -> Result<User, StoreError>;

    async fn find_group_id(&self, name: &str) -> Result<Option<Uuid>, StoreError>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_unique(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, group_id, provider, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, group_id, provider, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn save(&self, user: &User) -> Result<User, StoreError> {
        let saved = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, group_id, provider)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                group_id = EXCLUDED.group_id,
                provider = EXCLUDED.provider,
                updated_at = now()
            RETURNING id, email, password_hash, group_id, provider, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.group_id)
        .bind(&user.provider)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique)?;
        Ok(saved)
    }

    async fn find_group_id(&self, name: &str) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(r#"SELECT id FROM groups WHERE name = $1"#)
            .bind(name)
            .fetch_optional(&self.db)
            .await?;
        Ok(id)
    }
}

/// The only write path for users. Hashes a dirty password before handing the
/// record to the store; a clean record keeps its hash.
#[derive(Clone)]
pub struct Users {
    store: Arc<dyn UserStore>,
    hash_cost: u32,
    dummy_hash: Arc<OnceCell<String>>,
}

const DUMMY_PASSWORD: &str = "no-such-user-placeholder";

impl Users {
    pub fn new(store: Arc<dyn UserStore>, hash_cost: u32) -> Self {
        Self {
            store,
            hash_cost,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Runs a full bcrypt comparison for a login whose email matched no user,
    /// so response time does not reveal whether the account exists. Always
    /// `false`.
    pub async fn verify_absent(&self, candidate: &str) -> bool {
        let cost = self.hash_cost;
        match self
            .dummy_hash
            .get_or_try_init(|| password::hash_password(DUMMY_PASSWORD, cost))
            .await
        {
            Ok(hash) => {
                let _ = password::verify_password(candidate, hash).await;
            }
            Err(e) => error!(error = %e, "dummy hash unavailable"),
        }
        false
    }

    pub async fn save(&self, user: &mut User) -> Result<(), AuthError> {
        if let Some(plain) = user.take_pending_password() {
            match password::hash_password(&plain, self.hash_cost).await {
                Ok(hash) => user.password_hash = hash,
                Err(e) => {
                    user.set_password(plain);
                    return Err(AuthError::Internal(e));
                }
            }
            debug!(user_id = %user.id, "password hashed");
        }
        *user = self.store.save(user).await?;
        Ok(())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.find_by_email(email).await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.store.find_by_id(id).await?)
    }

    pub async fn find_group_id(&self, name: &str) -> Result<Option<Uuid>, AuthError> {
        Ok(self.store.find_group_id(name).await?)
    }
}
