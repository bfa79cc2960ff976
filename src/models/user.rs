use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author reference as we use it in the feed. Credentials and sessions live
/// in the backend auth service; we only ever read id + username here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

impl User {
    /// Stand-in for rows whose author reference did not resolve. Such rows
    /// still render instead of being dropped from the page.
    pub fn anonymous(id: Uuid) -> Self {
        Self {
            id,
            username: "anonymous".to_string(),
        }
    }
}
