use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::comment::Comment;
use crate::models::post::Post;
use crate::models::user::User;
use crate::repositories::post_store::{ImageUpload, PostStore, StoreError};

/// In-process store backend, selected with `STORE_BACKEND=memory`. Useful
/// for local development without backend credentials and as the store under
/// test. Ordering and validation semantics match the Supabase backend.
#[derive(Default)]
pub struct PostMemoryRepo {
    inner: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    posts: Vec<Post>,
    images: HashMap<String, Vec<u8>>,
}

impl PostMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known authors resolve to their username; unknown ids fall back to the
    /// anonymous placeholder, same as an unresolved join on the remote side.
    pub fn register_user(&self, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
        };
        let mut state = self.inner.write().unwrap();
        state.users.insert(user.id, user.clone());
        user
    }

    fn resolve_author(state: &MemoryState, author_id: Uuid) -> User {
        state
            .users
            .get(&author_id)
            .cloned()
            .unwrap_or_else(|| User::anonymous(author_id))
    }
}

#[async_trait]
impl PostStore for PostMemoryRepo {
    async fn fetch_recent_posts(
        &self,
        limit: u32,
        include_comments: bool,
    ) -> Result<Vec<Post>, StoreError> {
        let state = self.inner.read().unwrap();
        let mut posts: Vec<Post> = state.posts.clone();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        posts.truncate(limit as usize);
        if !include_comments {
            for post in &mut posts {
                post.comments.clear();
            }
        }
        Ok(posts)
    }

    async fn append_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: &str,
    ) -> Result<Post, StoreError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(StoreError::Validation("comment text is empty".to_string()));
        }

        let mut state = self.inner.write().unwrap();
        let author = Self::resolve_author(&state, author_id);
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or(StoreError::NotFound)?;
        post.comments.push(Comment {
            id: Uuid::new_v4(),
            post_id,
            author,
            text: trimmed.to_string(),
            created_at: Utc::now(),
        });
        Ok(post.clone())
    }

    async fn create_post(
        &self,
        author_id: Uuid,
        description: &str,
        image: ImageUpload,
    ) -> Result<Post, StoreError> {
        if image.bytes.is_empty() {
            return Err(StoreError::Validation("missing image".to_string()));
        }

        let mut state = self.inner.write().unwrap();
        let author = Self::resolve_author(&state, author_id);
        let name = format!("{}_{}", author_id, Uuid::new_v4());
        state.images.insert(name.clone(), image.bytes);
        let post = Post {
            id: Uuid::new_v4(),
            author,
            description: description.to_string(),
            image_url: Some(format!("memory://images/{}", name)),
            created_at: Utc::now(),
            comments: Vec::new(),
        };
        state.posts.push(post.clone());
        Ok(post)
    }
}
