use serde::{Deserialize, Serialize};

use crate::models::post::Post;

/// Body for `POST /api/posts`. The image travels base64-encoded, optionally
/// as a data URL.
#[derive(Debug, Deserialize)]
pub struct CreatePostIn {
    pub description: String,
    pub image_data: String,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct PostOut {
    pub id: String,
    pub author: String,
    pub description: String,
    pub image_url: Option<String>,
    pub created_at: String,
    pub comment_count: usize,
}

impl From<Post> for PostOut {
    fn from(post: Post) -> Self {
        Self {
            id: post.id.to_string(),
            author: post.author.username,
            description: post.description,
            image_url: post.image_url,
            created_at: post.created_at.to_rfc3339(),
            comment_count: post.comments.len(),
        }
    }
}
