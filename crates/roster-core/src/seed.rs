use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::model::{User, UserId};

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("IO error reading seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Seed file is not a JSON array of users: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn builtin_users() -> Vec<User> {
    vec![
        User {
            id: UserId(1),
            fname: "John".to_string(),
            city: "New York".to_string(),
            phone: 1234567890,
            height: 180.5,
            married: true,
        },
        User {
            id: UserId(2),
            fname: "Jane".to_string(),
            city: "Los Angeles".to_string(),
            phone: 9876543210,
            height: 165.2,
            married: false,
        },
    ]
}

pub fn load_seed_file(path: &Path) -> Result<Vec<User>, SeedError> {
    let content = std::fs::read_to_string(path)?;
    let records: Vec<roster_types::User> = serde_json::from_str(&content)?;
    Ok(records.into_iter().map(User::from).collect())
}

/// Merges seed sources in order. A later record with an id already seen
/// replaces the earlier one.
pub fn merge_seed(sources: impl IntoIterator<Item = Vec<User>>) -> Vec<User> {
    let mut order: Vec<UserId> = Vec::new();
    let mut by_id: HashMap<UserId, User> = HashMap::new();

    for user in sources.into_iter().flatten() {
        if by_id.contains_key(&user.id) {
            warn!("Seed user {} defined more than once, keeping the later one", user.id);
        } else {
            order.push(user.id);
        }
        by_id.insert(user.id, user);
    }

    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}
