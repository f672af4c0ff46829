use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const DELETED_CONTENT: &str = "[deleted]";

/// Comment as stored. `vote_score` is not a column.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Uuid,
    pub content: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Uuid,
    pub content: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub vote_score: i64,
}

impl Comment {
    pub fn enrich(record: CommentRecord, vote_score: i64) -> Self {
        Self {
            id: record.id,
            post_id: record.post_id,
            parent_id: record.parent_id,
            author_id: record.author_id,
            content: record.content,
            is_deleted: record.is_deleted,
            created_at: record.created_at,
            vote_score,
        }
    }
}

/// A comment and its ordered replies.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

// Flatten the subtree before dropping so deep reply chains free iteratively
impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

// Create comment request
#[derive(Debug, Validate, Deserialize)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    pub parent_id: Option<Uuid>,
}

// Comment sorting options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSort {
    #[default]
    Top,
    New,
    Old,
    Controversial,
}

#[derive(Debug, Deserialize)]
pub struct CommentThreadQuery {
    pub sort: Option<CommentSort>,
}
