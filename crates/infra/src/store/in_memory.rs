use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use userdir_core::User;

use super::r#trait::{NewUser, StoreError, UserPatch, UserStore};

/// In-memory user store.
///
/// Intended for tests/dev. Uniqueness is enforced the same way the real
/// schema does, so conflict handling can be exercised without Postgres.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<i64, User>,
    next_id: i64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;

        if let Some(existing) = inner
            .users
            .values()
            .find(|u| u.username == new_user.username || u.email == new_user.email)
        {
            return Err(StoreError::UniqueViolation(format!(
                "username or email already taken by user {}",
                existing.id
            )));
        }

        inner.next_id += 1;
        let now = Utc::now();
        let user = User {
            id: inner.next_id,
            username: new_user.username,
            email: new_user.email,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find(&self, id: i64) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.users.get(&id).cloned())
    }

    async fn update(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;

        if !inner.users.contains_key(&id) {
            return Ok(None);
        }

        // Uniqueness check against every other row before mutating.
        if let Some(conflicting) = inner.users.values().find(|u| {
            u.id != id
                && (patch.username.as_deref() == Some(u.username.as_str())
                    || patch.email.as_deref() == Some(u.email.as_str()))
        }) {
            return Err(StoreError::UniqueViolation(format!(
                "username or email already taken by user {}",
                conflicting.id
            )));
        }

        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        Ok(inner.users.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn lock_poisoned() -> StoreError {
    StoreError::Database("lock poisoned".to_string())
}
