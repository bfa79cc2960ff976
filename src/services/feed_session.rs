use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, watch};
use uuid::Uuid;

use crate::models::comment::Comment;
use crate::models::post::Post;
use crate::repositories::post_store::{PostStore, StoreError};
use crate::services::comment_submission::{CommentDraft, SubmissionCoordinator, SubmissionError};
use crate::services::feed_assembler::{self, FeedRow};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("no feed section at index {0}")]
    SectionOutOfRange(usize),
    #[error("feed session is closed")]
    Closed,
}

/// How a `refresh` call was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// This call performed the store fetch.
    Fetched,
    /// A fetch was already in flight; its result was shared with this call.
    Joined,
}

struct Section {
    post: Post,
    rows: Vec<FeedRow>,
}

type FetchResult = Result<usize, FeedError>;

/// The single logical feed session: one page of posts flattened into
/// sections, one outstanding fetch at most, one outstanding comment write
/// at most. Store failures never overwrite previously rendered sections.
pub struct FeedSession {
    store: Arc<dyn PostStore>,
    page_size: u32,
    sections: RwLock<Vec<Section>>,
    loaded: AtomicBool,
    closed: AtomicBool,
    inflight: Mutex<Option<watch::Receiver<Option<FetchResult>>>>,
    submissions: SubmissionCoordinator,
}

impl FeedSession {
    pub fn new(store: Arc<dyn PostStore>, page_size: u32) -> Self {
        Self {
            store,
            page_size,
            sections: RwLock::new(Vec::new()),
            loaded: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            inflight: Mutex::new(None),
            submissions: SubmissionCoordinator::new(),
        }
    }

    pub async fn section_count(&self) -> usize {
        self.sections.read().await.len()
    }

    pub async fn row_count(&self, post_index: usize) -> Option<usize> {
        self.sections
            .read()
            .await
            .get(post_index)
            .map(|s| s.rows.len())
    }

    pub async fn row(&self, post_index: usize, row_index: usize) -> Option<FeedRow> {
        self.sections
            .read()
            .await
            .get(post_index)
            .and_then(|s| s.rows.get(row_index))
            .cloned()
    }

    pub async fn rows(&self, post_index: usize) -> Option<Vec<FeedRow>> {
        self.sections
            .read()
            .await
            .get(post_index)
            .map(|s| s.rows.clone())
    }

    pub async fn snapshot(&self) -> Vec<Vec<FeedRow>> {
        self.sections
            .read()
            .await
            .iter()
            .map(|s| s.rows.clone())
            .collect()
    }

    pub fn draft(&self) -> Option<CommentDraft> {
        self.submissions.draft()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// First page load happens lazily, on first access.
    pub async fn ensure_loaded(&self) -> Result<(), FeedError> {
        if !self.is_loaded() {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Page teardown. An in-flight fetch resolving afterwards is discarded
    /// without touching the rendered sections.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Fetch the page and rebuild every section. Single-flight: a refresh
    /// issued while one is pending does not hit the store again; it parks on
    /// the pending fetch and both callers observe that one result.
    pub async fn refresh(&self) -> Result<RefreshOutcome, FeedError> {
        if self.is_closed() {
            return Err(FeedError::Closed);
        }

        let tx = {
            let mut inflight = self.inflight.lock().await;
            if let Some(rx) = inflight.as_ref() {
                let mut rx = rx.clone();
                drop(inflight);
                return Self::join_inflight(&mut rx).await;
            }
            let (tx, rx) = watch::channel(None);
            *inflight = Some(rx);
            tx
        };

        let fetched = self
            .store
            .fetch_recent_posts(self.page_size, true)
            .await;

        let applied: FetchResult = match fetched {
            Ok(posts) if !self.is_closed() => {
                let rows_per_post = feed_assembler::flatten(&posts);
                let sections: Vec<Section> = posts
                    .into_iter()
                    .zip(rows_per_post)
                    .map(|(post, rows)| Section { post, rows })
                    .collect();
                let count = sections.len();
                *self.sections.write().await = sections;
                self.loaded.store(true, Ordering::Release);
                Ok(count)
            }
            // resolved after teardown: discard, sections stay as they were
            Ok(_) => Err(FeedError::Closed),
            // prior sections stay visible on failure
            Err(e) => Err(FeedError::Store(e)),
        };

        // free the slot before publishing so a caller arriving now starts a
        // fresh fetch instead of parking on a finished one
        *self.inflight.lock().await = None;
        let _ = tx.send(Some(applied.clone()));

        applied.map(|_| RefreshOutcome::Fetched)
    }

    async fn join_inflight(
        rx: &mut watch::Receiver<Option<FetchResult>>,
    ) -> Result<RefreshOutcome, FeedError> {
        loop {
            let current = rx.borrow().clone();
            if let Some(result) = current {
                return result.map(|_| RefreshOutcome::Joined);
            }
            if rx.changed().await.is_err() {
                return Err(FeedError::Store(StoreError::Unavailable(
                    "pending fetch was dropped".to_string(),
                )));
            }
        }
    }

    /// Validate and append a comment to the post at `post_index`, then
    /// rebuild that section's rows. Empty text is rejected locally; the
    /// store is never contacted. `NotFound` from the store means the page no
    /// longer matches the backend, so a reload is kicked off before the
    /// error is reported. The draft survives any store failure.
    pub async fn submit_comment(
        &self,
        post_index: usize,
        author_id: Uuid,
        text: &str,
    ) -> Result<Comment, FeedError> {
        if self.is_closed() {
            return Err(FeedError::Closed);
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FeedError::Store(StoreError::Validation(
                "comment text is empty".to_string(),
            )));
        }

        let post_id = {
            let sections = self.sections.read().await;
            sections
                .get(post_index)
                .map(|s| s.post.id)
                .ok_or(FeedError::SectionOutOfRange(post_index))?
        };

        self.submissions.begin(post_id)?;

        match self.store.append_comment(post_id, author_id, trimmed).await {
            Ok(updated) => {
                let appended = updated.comments.last().cloned();
                self.submissions.commit();
                self.replace_section(post_id, updated).await;
                appended.ok_or_else(|| {
                    FeedError::Store(StoreError::Unavailable(
                        "store returned post without the appended comment".to_string(),
                    ))
                })
            }
            Err(err) => {
                self.submissions.fail(trimmed);
                if matches!(err, StoreError::NotFound) {
                    if let Err(refresh_err) = self.refresh().await {
                        warn!("reload after feed desync failed: {}", refresh_err);
                    }
                }
                Err(FeedError::Store(err))
            }
        }
    }

    /// Re-flatten only the affected section; the rest of the page keeps its
    /// rows untouched.
    async fn replace_section(&self, post_id: Uuid, post: Post) {
        let mut sections = self.sections.write().await;
        if let Some(section) = sections.iter_mut().find(|s| s.post.id == post_id) {
            section.rows = feed_assembler::flatten_post(&post);
            section.post = post;
        }
    }
}
