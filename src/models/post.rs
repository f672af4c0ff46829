use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::VoteTally;

/// Post as stored; engagement fields are derived on read.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Post enriched with engagement facts.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub vote_score: i64,
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub comment_count: i64,
}

impl Post {
    pub fn enrich(record: PostRecord, tally: VoteTally, comment_count: i64) -> Self {
        Self {
            id: record.id,
            author_id: record.author_id,
            title: record.title,
            created_at: record.created_at,
            vote_score: tally.score,
            upvote_count: tally.upvotes,
            downvote_count: tally.downvotes,
            comment_count,
        }
    }
}

/// A post placed in a feed, with the score it was ranked by.
#[derive(Debug, Clone, Serialize)]
pub struct RankedPost {
    #[serde(flatten)]
    pub post: Post,
    pub rank_score: Option<f64>,
}

// Sorting options for posts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    Hot,
    New,
    Top,
    Rising,
    Controversial,
}

impl FromStr for PostSort {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" | "Hot" => Ok(PostSort::Hot),
            "new" | "New" => Ok(PostSort::New),
            "top" | "Top" => Ok(PostSort::Top),
            "rising" | "Rising" => Ok(PostSort::Rising),
            "controversial" | "Controversial" => Ok(PostSort::Controversial),
            _ => Err(format!("Unknown PostSort: {}", s)),
        }
    }
}

/// Store-side narrowing of a feed fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    /// Inclusive lower bound on `created_at`.
    pub created_after: Option<DateTime<Utc>>,
}

/// One ranked page of the feed.
#[derive(Debug, Clone, Serialize)]
pub struct Feed {
    pub posts: Vec<RankedPost>,
    /// True when the page came back full. May be a false positive.
    pub has_more: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeedQuery {
    pub sort: Option<PostSort>,
    #[validate(range(min = 1, message = "page starts at 1"))]
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
