use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Draft kept after a failed submission so the caller can retry with the
/// same text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentDraft {
    pub post_id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("a comment submission is already in flight")]
    InFlight,
}

#[derive(Debug)]
enum SubmissionState {
    Idle,
    Submitting { post_id: Uuid },
}

#[derive(Debug)]
struct Inner {
    state: SubmissionState,
    draft: Option<CommentDraft>,
}

/// Serializes comment writes: one targeted post at a time.
/// `Idle -> Submitting -> {commit, fail} -> Idle`. Targeting another post
/// while a submission is unresolved is rejected, not queued.
pub struct SubmissionCoordinator {
    inner: Mutex<Inner>,
}

impl SubmissionCoordinator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SubmissionState::Idle,
                draft: None,
            }),
        }
    }

    /// Enter `Submitting` for `post_id`.
    pub fn begin(&self, post_id: Uuid) -> Result<(), SubmissionError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            SubmissionState::Submitting { .. } => Err(SubmissionError::InFlight),
            SubmissionState::Idle => {
                inner.state = SubmissionState::Submitting { post_id };
                Ok(())
            }
        }
    }

    /// Store acknowledged the write: clear the draft, back to idle.
    pub fn commit(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = SubmissionState::Idle;
        inner.draft = None;
    }

    /// Store reported a failure: keep the draft for retry, back to idle.
    pub fn fail(&self, text: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let SubmissionState::Submitting { post_id } = inner.state {
            inner.draft = Some(CommentDraft {
                post_id,
                text: text.to_string(),
            });
        }
        inner.state = SubmissionState::Idle;
    }

    pub fn draft(&self) -> Option<CommentDraft> {
        self.inner.lock().unwrap().draft.clone()
    }

    pub fn is_submitting(&self) -> bool {
        matches!(
            self.inner.lock().unwrap().state,
            SubmissionState::Submitting { .. }
        )
    }
}

impl Default for SubmissionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
