use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::comment::Comment;
use crate::models::user::User;

/// A feed post. Description and image are set once at creation; there is no
/// edit operation. `created_at` is assigned by the store and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author: User,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Insertion order, oldest first.
    pub comments: Vec<Comment>,
}
