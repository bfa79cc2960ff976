use serde::{Deserialize, Serialize};

use crate::models::comment::Comment;
use crate::services::feed_assembler::FeedRow;
use crate::services::feed_session::RefreshOutcome;

#[derive(Debug, Deserialize)]
pub struct SubmitCommentIn {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct FeedSectionOut {
    pub section: usize,
    pub row_count: usize,
    pub rows: Vec<FeedRow>,
}

#[derive(Debug, Serialize)]
pub struct FeedOut {
    pub section_count: usize,
    pub sections: Vec<FeedSectionOut>,
}

#[derive(Debug, Serialize)]
pub struct RefreshOut {
    /// "fetched" when this call hit the store, "joined" when it shared a
    /// fetch that was already in flight.
    pub outcome: &'static str,
    pub section_count: usize,
}

impl RefreshOut {
    pub fn new(outcome: RefreshOutcome, section_count: usize) -> Self {
        let outcome = match outcome {
            RefreshOutcome::Fetched => "fetched",
            RefreshOutcome::Joined => "joined",
        };
        Self {
            outcome,
            section_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitCommentOut {
    pub comment: Comment,
    pub row_count: usize,
}
