//! Scoring formulas for feed and comment sort modes.
//!
//! Every function here is pure: engagement facts and "now" in, a score out.
//! Higher scores rank first and ties fall back to the most recent post.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};

use crate::models::{Comment, CommentSort, Post, PostSort};

/// How far back the `top` feed looks.
pub const TOP_WINDOW_HOURS: i64 = 7 * 24;
/// How far back the `rising` feed looks.
pub const RISING_WINDOW_HOURS: i64 = 24;
/// Below this many total votes a post has no controversy score.
pub const CONTROVERSY_MIN_VOTES: i64 = 5;

const HOT_AGE_OFFSET: f64 = 2.0;
const HOT_GRAVITY: f64 = 1.5;

/// Rank of a post under one sort mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rank {
    Score(f64),
    /// Too few votes to say anything; sorts after every scored post.
    InsufficientSignal,
    /// Mode orders by timestamp alone.
    Chronological,
}

impl Rank {
    pub fn value(self) -> Option<f64> {
        match self {
            Rank::Score(score) => Some(score),
            Rank::InsufficientSignal | Rank::Chronological => None,
        }
    }
}

/// Fractional hours since `created_at`. Future timestamps count as zero.
pub fn age_hours(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - created_at).num_milliseconds() as f64;
    (millis / 3_600_000.0).max(0.0)
}

pub fn hot_score(
    vote_score: i64,
    comment_count: i64,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let engagement = (vote_score * 2 + comment_count * 3) as f64;
    engagement / (age_hours(created_at, now) + HOT_AGE_OFFSET).powf(HOT_GRAVITY)
}

pub fn top_score(vote_score: i64, comment_count: i64) -> f64 {
    (vote_score + comment_count) as f64
}

/// Engagement per hour, with the first hour counted as a full hour.
pub fn rising_score(
    vote_score: i64,
    comment_count: i64,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    (vote_score + comment_count) as f64 / age_hours(created_at, now).max(1.0)
}

/// `(1 - |0.5 - up/total|) * total`, or `InsufficientSignal` under five votes.
pub fn controversy(upvotes: i64, downvotes: i64) -> Rank {
    let total = upvotes + downvotes;
    if total < CONTROVERSY_MIN_VOTES {
        return Rank::InsufficientSignal;
    }

    let total = total as f64;
    let balance = (0.5 - upvotes as f64 / total).abs();
    Rank::Score((1.0 - balance) * total)
}

/// Lower bound on `created_at` for modes that only consider recent posts.
pub fn window_start(sort: PostSort, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match sort {
        PostSort::Top => Some(now - Duration::hours(TOP_WINDOW_HOURS)),
        PostSort::Rising => Some(now - Duration::hours(RISING_WINDOW_HOURS)),
        PostSort::Hot | PostSort::New | PostSort::Controversial => None,
    }
}

pub fn rank_post(post: &Post, sort: PostSort, now: DateTime<Utc>) -> Rank {
    match sort {
        PostSort::Hot => Rank::Score(hot_score(
            post.vote_score,
            post.comment_count,
            post.created_at,
            now,
        )),
        PostSort::New => Rank::Chronological,
        PostSort::Top => Rank::Score(top_score(post.vote_score, post.comment_count)),
        PostSort::Rising => Rank::Score(rising_score(
            post.vote_score,
            post.comment_count,
            post.created_at,
            now,
        )),
        PostSort::Controversial => controversy(post.upvote_count, post.downvote_count),
    }
}

/// Descending by rank, then newest first.
pub fn compare_ranked(
    a: Rank,
    a_created: DateTime<Utc>,
    b: Rank,
    b_created: DateTime<Utc>,
) -> Ordering {
    let by_rank = match (a, b) {
        (Rank::Score(x), Rank::Score(y)) => y.total_cmp(&x),
        (Rank::Score(_), _) => Ordering::Less,
        (_, Rank::Score(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    };

    by_rank.then_with(|| b_created.cmp(&a_created))
}

// Comment controversy looks at net score only, unlike posts.
pub fn compare_comments(a: &Comment, b: &Comment, sort: CommentSort) -> Ordering {
    let newest_first = b.created_at.cmp(&a.created_at);
    match sort {
        CommentSort::Top => b.vote_score.cmp(&a.vote_score).then(newest_first),
        CommentSort::New => newest_first,
        CommentSort::Old => a.created_at.cmp(&b.created_at),
        CommentSort::Controversial => a
            .vote_score
            .unsigned_abs()
            .cmp(&b.vote_score.unsigned_abs())
            .then(newest_first),
    }
}
