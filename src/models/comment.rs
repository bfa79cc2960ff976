use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::User;

/// A comment on a post. Append-only: comments are never edited or removed
/// through this service, and each belongs to exactly one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: User,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
