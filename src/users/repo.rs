use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::repo_types::{StoreError, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Any row with this email, active or not.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Only rows that are allowed to sign in.
    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;
    /// Stamps `last_login` with the current time and returns it.
    async fn record_login(&self, id: i64) -> Result<OffsetDateTime, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password AS password_hash, created_at, last_login, is_active
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password AS password_hash, created_at, last_login, is_active
            FROM users
            WHERE email = $1 AND is_active = TRUE
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password AS password_hash, created_at, last_login, is_active
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password)
            VALUES ($1, $2)
            RETURNING id, email, password AS password_hash, created_at, last_login, is_active
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn record_login(&self, id: i64) -> Result<OffsetDateTime, StoreError> {
        let (last_login,): (OffsetDateTime,) = sqlx::query_as(
            r#"
            UPDATE users
               SET last_login = now()
             WHERE id = $1
            RETURNING last_login
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(last_login)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
