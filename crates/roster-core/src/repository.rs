//! User storage.
//!
//! The store is a `HashMap` behind a `tokio::sync::RwLock`: lookups, search
//! and listing share the read guard, `add_user` holds the write guard across
//! the duplicate check and the insert so two concurrent adds of the same id
//! cannot both succeed.

use std::collections::HashMap;

use async_trait::async_trait;
use fastrace::trace;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{UserError, UserResult};
use crate::model::{SearchCriteria, User, UserId};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Validates and stores a new user, returning the stored record.
    ///
    /// Checks run in a fixed order and the first failure wins: id, city,
    /// first name, height, phone, then uniqueness of the id.
    async fn add_user(&self, user: User) -> UserResult<User>;

    async fn get_user_by_id(&self, id: i32) -> UserResult<User>;

    /// Best-effort bulk lookup. Ids that are zero or unknown are skipped;
    /// the remaining records keep the order of `ids`.
    async fn get_users_by_id(&self, ids: &[i32]) -> Vec<User>;

    /// Full scan returning every user that satisfies all supplied filters,
    /// in no particular order.
    async fn search_users(&self, criteria: &SearchCriteria) -> UserResult<Vec<User>>;

    /// One page of users sorted by ascending id.
    ///
    /// A `page_size` of zero or less means the whole store is a single page.
    /// A page whose start offset falls outside the store returns every user.
    async fn list_users(&self, page_size: i32, page: i32) -> Vec<User>;

    async fn count_users(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a repository over an initial set of users. Seed records are
    /// stored as given, without validation.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let users = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: RwLock::new(users),
        }
    }
}

#[trace]
fn validate_new_user(user: &User) -> UserResult<()> {
    if user.id.is_zero() {
        return Err(UserError::InvalidId);
    }
    if user.city.is_empty() {
        return Err(UserError::InvalidCity);
    }
    if user.fname.is_empty() {
        return Err(UserError::InvalidFName);
    }
    // Truncation toward zero; NaN casts to 0 as well.
    if user.height as i64 == 0 {
        return Err(UserError::InvalidHeight);
    }
    if user.phone == 0 {
        return Err(UserError::InvalidPhone);
    }
    Ok(())
}

fn lookup(users: &HashMap<UserId, User>, id: i32) -> UserResult<User> {
    if id == 0 {
        return Err(UserError::InvalidId);
    }
    users.get(&UserId(id)).cloned().ok_or(UserError::NotFound)
}

#[trace]
fn paginate(users: Vec<User>, page_size: i32, page: i32) -> Vec<User> {
    let mut users = users;
    users.sort_by_key(|u| u.id);

    let len = users.len() as i64;
    let page_size = if page_size <= 0 {
        len
    } else {
        i64::from(page_size)
    };

    let start = i64::from(page).saturating_mul(page_size);
    if start < 0 || start >= len {
        return users;
    }
    let end = start.saturating_add(page_size).min(len);

    users.truncate(end as usize);
    users.drain(..start as usize);
    users
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn add_user(&self, user: User) -> UserResult<User> {
        validate_new_user(&user)?;

        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(UserError::IdAlreadyExists);
        }
        users.insert(user.id, user.clone());
        debug!("Stored user {} ({} total)", user.id, users.len());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: i32) -> UserResult<User> {
        let users = self.users.read().await;
        lookup(&users, id)
    }

    async fn get_users_by_id(&self, ids: &[i32]) -> Vec<User> {
        let users = self.users.read().await;
        ids.iter()
            .filter_map(|&id| lookup(&users, id).ok())
            .collect()
    }

    async fn search_users(&self, criteria: &SearchCriteria) -> UserResult<Vec<User>> {
        if criteria.is_empty() {
            return Err(UserError::InvalidSearchRequest);
        }

        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|u| criteria.matches(u))
            .cloned()
            .collect())
    }

    async fn list_users(&self, page_size: i32, page: i32) -> Vec<User> {
        let snapshot: Vec<User> = self.users.read().await.values().cloned().collect();
        paginate(snapshot, page_size, page)
    }

    async fn count_users(&self) -> usize {
        self.users.read().await.len()
    }
}
