use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::comment::Comment;
use crate::models::post::Post;
use crate::models::user::User;

/// One addressable row of a feed section. Rebuilt whenever the section's
/// post changes or a new page loads; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedRow {
    PostHeader {
        post_id: Uuid,
        author: User,
        description: String,
        image_url: Option<String>,
        created_at: DateTime<Utc>,
    },
    Comment {
        post_id: Uuid,
        comment: Comment,
        /// Row index inside the section (row 0 is the header).
        position: usize,
    },
    AddComment {
        post_id: Uuid,
    },
}

/// Flatten one post into its section rows: header, one row per comment in
/// original order, then the add-comment affordance. Always `|comments| + 2`
/// rows, even with no comments. A post with a missing image or author still
/// gets its rows; the header just carries the defaults.
pub fn flatten_post(post: &Post) -> Vec<FeedRow> {
    let mut rows = Vec::with_capacity(post.comments.len() + 2);
    rows.push(FeedRow::PostHeader {
        post_id: post.id,
        author: post.author.clone(),
        description: post.description.clone(),
        image_url: post.image_url.clone(),
        created_at: post.created_at,
    });
    for (i, comment) in post.comments.iter().enumerate() {
        rows.push(FeedRow::Comment {
            post_id: post.id,
            comment: comment.clone(),
            position: i + 1,
        });
    }
    rows.push(FeedRow::AddComment { post_id: post.id });
    rows
}

/// Flatten a fetched page: post index -> that post's row sequence.
pub fn flatten(posts: &[Post]) -> Vec<Vec<FeedRow>> {
    posts.iter().map(flatten_post).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
        }
    }

    fn sample_post(comment_count: usize) -> Post {
        let post_id = Uuid::new_v4();
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let comments = (0..comment_count)
            .map(|i| Comment {
                id: Uuid::new_v4(),
                post_id,
                author: sample_user("bob"),
                text: format!("comment {}", i),
                created_at: created_at + chrono::Duration::minutes(i as i64 + 1),
            })
            .collect();
        Post {
            id: post_id,
            author: sample_user("ada"),
            description: "golden hour".to_string(),
            image_url: Some("https://cdn.example/p.jpg".to_string()),
            created_at,
            comments,
        }
    }

    #[test]
    fn row_count_is_comments_plus_two() {
        for count in [0usize, 1, 2, 5] {
            let rows = flatten_post(&sample_post(count));
            assert_eq!(rows.len(), count + 2);
        }
    }

    #[test]
    fn empty_post_still_gets_header_and_add_row() {
        let post = sample_post(0);
        let rows = flatten_post(&post);
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[0], FeedRow::PostHeader { .. }));
        assert!(matches!(rows[1], FeedRow::AddComment { .. }));
    }

    #[test]
    fn comment_rows_sit_between_header_and_add_row_in_order() {
        let post = sample_post(3);
        let rows = flatten_post(&post);

        assert!(matches!(rows[0], FeedRow::PostHeader { .. }));
        assert!(matches!(rows.last(), Some(FeedRow::AddComment { .. })));
        for (i, row) in rows[1..=3].iter().enumerate() {
            match row {
                FeedRow::Comment {
                    comment, position, ..
                } => {
                    assert_eq!(*position, i + 1);
                    assert_eq!(comment, &post.comments[i]);
                }
                other => panic!("expected comment row at index {}, got {:?}", i + 1, other),
            }
        }
    }

    #[test]
    fn page_flattens_section_per_post() {
        let posts = vec![sample_post(0), sample_post(2), sample_post(5)];
        let sections = flatten(&posts);
        assert_eq!(sections.len(), 3);
        let counts: Vec<usize> = sections.iter().map(|rows| rows.len()).collect();
        assert_eq!(counts, vec![2, 4, 7]);
    }

    #[test]
    fn post_without_image_or_author_name_is_not_dropped() {
        let mut post = sample_post(1);
        post.image_url = None;
        post.author = User::anonymous(Uuid::nil());
        let rows = flatten_post(&post);
        assert_eq!(rows.len(), 3);
        match &rows[0] {
            FeedRow::PostHeader {
                image_url, author, ..
            } => {
                assert_eq!(*image_url, None);
                assert_eq!(author.username, "anonymous");
            }
            other => panic!("expected header row, got {:?}", other),
        }
    }
}
