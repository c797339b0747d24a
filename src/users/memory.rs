use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::repo::UserStore;
use super::repo_types::{StoreError, User};

/// In-process [`UserStore`] used by the HTTP tests.
#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
    down: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active(&self, email: &str, active: bool) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(u) = rows.iter_mut().find(|u| u.email == email) {
            u.is_active = active;
        }
    }

    /// While down, every call fails like a dropped connection.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check_up(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    pub fn snapshot(&self, email: &str) -> Option<User> {
        self.rows.lock().unwrap().iter().find(|u| u.email == email).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check_up()?;
        Ok(self.snapshot(email))
    }

    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check_up()?;
        Ok(self.snapshot(email).filter(|u| u.is_active))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.check_up()?;
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        self.check_up()?;
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|u| u.email == email) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: rows.len() as i64 + 1,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
            last_login: None,
            is_active: true,
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn record_login(&self, id: i64) -> Result<OffsetDateTime, StoreError> {
        self.check_up()?;
        let mut rows = self.rows.lock().unwrap();
        let user = rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::Unavailable(sqlx::Error::RowNotFound))?;
        let now = OffsetDateTime::now_utc();
        user.last_login = Some(now);
        Ok(now)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_up()?;
        Ok(())
    }
}
