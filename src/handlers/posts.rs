use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::OptionalAuthUser,
    error::{AppError, Result},
    handlers::check_vote_rate_limit,
    models::{FeedQuery, VoteRequest, VoteState, VoteTarget},
};

pub async fn get_posts(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> Result<Json<Value>> {
    params.validate()?;

    let page = params.page.unwrap_or(1);
    let limit = state.config.page_size(params.limit);
    let offset = (page - 1).saturating_mul(limit);
    let sort = params.sort.unwrap_or_default();

    let feed = state.feed.get_feed(sort, offset, limit).await?;

    Ok(Json(json!({
        "posts": feed.posts,
        "pagination": {
            "page": page,
            "limit": limit,
            "has_more": feed.has_more
        }
    })))
}

pub async fn get_post_votes(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    auth_user: OptionalAuthUser,
) -> Result<Json<VoteState>> {
    state
        .store
        .fetch_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let votes = state
        .votes
        .vote_state(post_id, VoteTarget::Post, auth_user.user_id())
        .await?;

    Ok(Json(votes))
}

pub async fn vote_post(
    State(state): State<AppState>,
    auth_user: OptionalAuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteState>> {
    let user_id = auth_user.user_id().ok_or(AppError::Unauthenticated)?;
    check_vote_rate_limit(&state, user_id).await?;

    // Check if post exists
    state
        .store
        .fetch_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let vote = state
        .votes
        .cast_vote(Some(user_id), post_id, VoteTarget::Post, payload.direction)
        .await?;

    Ok(Json(vote))
}
