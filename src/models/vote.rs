use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// Stored form: 1 for upvote, -1 for downvote.
    pub fn as_i16(self) -> i16 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(VoteDirection::Up),
            -1 => Some(VoteDirection::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteTarget {
    Post,
    Comment,
}

impl VoteTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteTarget::Post => "post",
            VoteTarget::Comment => "comment",
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw row as stored in `post_votes` / `comment_votes`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredVote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub vote_type: i16, // -1 for downvote, 1 for upvote
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One user's current vote on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRow {
    pub user_id: Uuid,
    pub direction: VoteDirection,
}

/// Aggregate over every current vote row of a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
}

impl VoteTally {
    pub fn from_rows(rows: &[VoteRow]) -> Self {
        let upvotes = rows
            .iter()
            .filter(|row| row.direction == VoteDirection::Up)
            .count() as i64;
        let downvotes = rows.len() as i64 - upvotes;

        Self {
            upvotes,
            downvotes,
            score: upvotes - downvotes,
        }
    }
}

/// What a cast did to the caller's vote row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Inserted,
    Removed,
    Switched,
}

// Vote request
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub direction: VoteDirection,
}

// Vote response
#[derive(Debug, Clone, Serialize)]
pub struct VoteState {
    pub target_id: Uuid,
    pub target_type: VoteTarget,
    pub user_vote: Option<VoteDirection>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<VoteAction>,
}

impl VoteState {
    pub fn new(
        target_id: Uuid,
        target_type: VoteTarget,
        rows: &[VoteRow],
        user_id: Option<Uuid>,
    ) -> Self {
        let tally = VoteTally::from_rows(rows);
        let user_vote = user_id.and_then(|uid| {
            rows.iter()
                .find(|row| row.user_id == uid)
                .map(|row| row.direction)
        });

        Self {
            target_id,
            target_type,
            user_vote,
            upvotes: tally.upvotes,
            downvotes: tally.downvotes,
            score: tally.score,
            action: None,
        }
    }
}
