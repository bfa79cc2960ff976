use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use urlencoding::encode;
use uuid::Uuid;

use crate::models::comment::Comment;
use crate::models::post::Post;
use crate::models::user::User;
use crate::repositories::post_store::{ImageUpload, PostStore, StoreError};

const POSTS_SELECT: &str = "*,author:users(id,username)";
const POSTS_WITH_COMMENTS_SELECT: &str =
    "*,author:users(id,username),comments(*,author:users(id,username))";

/// Repository for the `posts` / `comments` tables via the backend's
/// PostgREST API, with images going through its storage API. The request
/// deadline comes from the injected client, so a hung backend surfaces as
/// `Unavailable` instead of blocking the session.
#[derive(Clone)]
pub struct PostSupabaseRepo {
    client: Client,
    base_rest_url: String,    // e.g. https://xyz.supabase.co/rest/v1
    base_storage_url: String, // e.g. https://xyz.supabase.co/storage/v1
    service_role_key: String, // server-only key
    anon_key: Option<String>,
}

impl PostSupabaseRepo {
    pub fn new(
        supabase_url: &str,
        service_role_key: String,
        anon_key: Option<String>,
        client: Client,
    ) -> Self {
        let root = supabase_url.trim_end_matches('/');
        Self {
            client,
            base_rest_url: format!("{}/rest/v1", root),
            base_storage_url: format!("{}/storage/v1", root),
            service_role_key,
            anon_key,
        }
    }

    fn headers(&self) -> reqwest::header::HeaderMap {
        use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        // apikey is sometimes required; include anon_key if available
        if let Some(ref key) = self.anon_key {
            if let Ok(value) = HeaderValue::from_str(key) {
                headers.insert("apikey", value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", self.service_role_key)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    /// One post by id, author and comments expanded. Empty result means the
    /// post no longer exists.
    async fn fetch_post(&self, post_id: Uuid) -> Result<Post, StoreError> {
        let url = format!(
            "{}/posts?id=eq.{}&select={}&comments.order=created_at.asc",
            self.base_rest_url,
            encode(&post_id.to_string()),
            POSTS_WITH_COMMENTS_SELECT,
        );

        let resp = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Unavailable(format!(
                "{} -> {}",
                status.as_u16(),
                text
            )));
        }

        let records: Vec<PostRecord> = serde_json::from_str(&text)
            .map_err(|e| StoreError::Unavailable(format!("unexpected post payload: {}", e)))?;
        let record = records.into_iter().next().ok_or(StoreError::NotFound)?;
        map_post(record)
    }

    /// Raw image bytes into the `posts` bucket; returns the public URL the
    /// post row will reference.
    async fn upload_image(&self, author_id: Uuid, image: &ImageUpload) -> Result<String, StoreError> {
        let extension = match image.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "jpg", // fallback
        };
        let filename = format!("{}_{}.{}", author_id, Uuid::new_v4(), extension);
        let url = format!("{}/object/posts/{}", self.base_storage_url, filename);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("Content-Type", image.content_type.clone())
            .body(image.bytes.clone())
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(StoreError::Unavailable(format!(
                "image upload failed: {} -> {}",
                status.as_u16(),
                text
            )));
        }

        Ok(format!(
            "{}/object/public/posts/{}",
            self.base_storage_url, filename
        ))
    }
}

#[async_trait]
impl PostStore for PostSupabaseRepo {
    async fn fetch_recent_posts(
        &self,
        limit: u32,
        include_comments: bool,
    ) -> Result<Vec<Post>, StoreError> {
        let mut url = format!(
            "{}/posts?select={}&order=created_at.desc,id.desc&limit={}",
            self.base_rest_url,
            if include_comments {
                POSTS_WITH_COMMENTS_SELECT
            } else {
                POSTS_SELECT
            },
            limit,
        );
        if include_comments {
            url.push_str("&comments.order=created_at.asc");
        }

        let resp = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Unavailable(format!(
                "{} -> {}",
                status.as_u16(),
                text
            )));
        }

        let records: Vec<PostRecord> = serde_json::from_str(&text)
            .map_err(|e| StoreError::Unavailable(format!("unexpected posts payload: {}", e)))?;
        records.into_iter().map(map_post).collect()
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

        let url = format!("{}/comments", self.base_rest_url);
        let payload = json!({
            "post_id": post_id,
            "author_id": author_id,
            "text": trimmed,
        });

        let resp = self
            .client
            .post(&url)
            .headers(self.headers())
            .header("Prefer", "return=minimal")
            .json(&payload)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            // FK violation on post_id: the post was deleted under us
            if status == reqwest::StatusCode::CONFLICT {
                return Err(StoreError::NotFound);
            }
            return Err(StoreError::Unavailable(format!(
                "comment insert failed: {} -> {}",
                status.as_u16(),
                body
            )));
        }

        self.fetch_post(post_id).await
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

        let image_url = self.upload_image(author_id, &image).await?;

        let url = format!("{}/posts", self.base_rest_url);
        let payload = json!({
            "author_id": author_id,
            "description": description,
            "image_url": image_url,
        });

        let resp = self
            .client
            .post(&url)
            .headers(self.headers())
            .header("Prefer", "return=representation")
            .json(&payload)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Unavailable(format!(
                "post insert failed: {} -> {}",
                status.as_u16(),
                text
            )));
        }

        let records: Vec<PostRecord> = serde_json::from_str(&text)
            .map_err(|e| StoreError::Unavailable(format!("unexpected insert payload: {}", e)))?;
        let record = records
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Unavailable("no post returned from insert".to_string()))?;
        let created = map_post(record)?;

        // representation has no embedded author; refetch with expansions
        self.fetch_post(created.id).await
    }
}

// ---- wire records and their mapping into the typed model ----
//
// PostgREST rows arrive loosely typed. Identity fields are required and
// reject the payload when absent; display fields default so a half-resolved
// row still renders instead of disappearing from the page.

#[derive(Debug, Deserialize)]
struct UserRecord {
    id: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentRecord {
    id: Option<String>,
    post_id: Option<String>,
    text: Option<String>,
    created_at: Option<String>,
    author: Option<UserRecord>,
}

#[derive(Debug, Deserialize)]
struct PostRecord {
    id: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    created_at: Option<String>,
    author: Option<UserRecord>,
    comments: Option<Vec<CommentRecord>>,
}

fn map_user(record: Option<UserRecord>) -> User {
    match record {
        Some(rec) => {
            let id = rec
                .id
                .as_deref()
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or(Uuid::nil());
            match rec.username.filter(|name| !name.trim().is_empty()) {
                Some(username) => User { id, username },
                None => User::anonymous(id),
            }
        }
        None => User::anonymous(Uuid::nil()),
    }
}

fn map_timestamp(raw: Option<String>, what: &str) -> DateTime<Utc> {
    let Some(raw) = raw else {
        warn!("{} has no created_at, defaulting to epoch", what);
        return DateTime::UNIX_EPOCH;
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return parsed.with_timezone(&Utc);
    }
    // `timestamp` columns come back without an offset; treat them as UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc();
    }
    warn!("{} has unparseable created_at {:?}, defaulting to epoch", what, raw);
    DateTime::UNIX_EPOCH
}

fn map_comment(record: CommentRecord, fallback_post_id: Uuid) -> Result<Comment, StoreError> {
    let id = record
        .id
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| StoreError::Unavailable("comment record missing id".to_string()))?;
    let post_id = record
        .post_id
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or(fallback_post_id);
    Ok(Comment {
        id,
        post_id,
        author: map_user(record.author),
        text: record.text.unwrap_or_default(),
        created_at: map_timestamp(record.created_at, "comment"),
    })
}

fn map_post(record: PostRecord) -> Result<Post, StoreError> {
    let id = record
        .id
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| StoreError::Unavailable("post record missing id".to_string()))?;
    let comments = record
        .comments
        .unwrap_or_default()
        .into_iter()
        .map(|c| map_comment(c, id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Post {
        id,
        author: map_user(record.author),
        description: record.description.unwrap_or_default(),
        image_url: record.image_url.filter(|url| !url.trim().is_empty()),
        created_at: map_timestamp(record.created_at, "post"),
        comments,
    })
}
