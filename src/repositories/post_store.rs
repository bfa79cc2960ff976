use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::post::Post;

/// Store failures, shared by every backend. `Clone` because the result of an
/// in-flight fetch is broadcast to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("post not found")]
    NotFound,
    #[error("validation: {0}")]
    Validation(String),
}

/// Image payload for post creation, already decoded from its transport
/// representation.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Persistence boundary for posts and comments. The backend owns canonical
/// state; everything this service holds is a derived read-only view.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Recent posts, newest first. Ties on `created_at` break by id
    /// descending so row indices stay stable across identical fetches.
    async fn fetch_recent_posts(
        &self,
        limit: u32,
        include_comments: bool,
    ) -> Result<Vec<Post>, StoreError>;

    /// Append a comment and return the updated post.
    /// Fails `NotFound` when the post is gone and `Validation` on empty text.
    async fn append_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: &str,
    ) -> Result<Post, StoreError>;

    /// Create a post from a description and an uploaded image.
    /// Fails `Validation` when the image payload is empty.
    async fn create_post(
        &self,
        author_id: Uuid,
        description: &str,
        image: ImageUpload,
    ) -> Result<Post, StoreError>;
}
