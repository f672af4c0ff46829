pub mod comments;
pub mod posts;

use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
};

const VOTE_RATE_WINDOW_SECONDS: usize = 3600;
const COMMENT_RATE_WINDOW_SECONDS: usize = 60;

/// Per-user vote cap, a no-op when Redis is not configured.
pub(crate) async fn check_vote_rate_limit(state: &AppState, user_id: Uuid) -> Result<()> {
    enforce_rate_limit(
        state,
        &vote_rate_limit_key(user_id),
        state.config.vote_rate_limit,
        VOTE_RATE_WINDOW_SECONDS,
    )
    .await
}

/// Per-user comment creation cap, a no-op when Redis is not configured.
pub(crate) async fn check_comment_rate_limit(state: &AppState, user_id: Uuid) -> Result<()> {
    enforce_rate_limit(
        state,
        &comment_rate_limit_key(user_id),
        state.config.comment_rate_limit,
        COMMENT_RATE_WINDOW_SECONDS,
    )
    .await
}

fn vote_rate_limit_key(user_id: Uuid) -> String {
    format!("vote:{}", user_id)
}

fn comment_rate_limit_key(user_id: Uuid) -> String {
    format!("comment_create:user:{}", user_id)
}

async fn enforce_rate_limit(
    state: &AppState,
    key: &str,
    limit: u32,
    window_seconds: usize,
) -> Result<()> {
    let Some(redis) = &state.redis else {
        return Ok(());
    };

    if !redis.check_rate_limit(key, limit, window_seconds).await? {
        tracing::warn!("Rate limit hit for {}", key);
        return Err(AppError::RateLimit);
    }

    Ok(())
}
