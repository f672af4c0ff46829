use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    auth::OptionalAuthUser,
    error::{AppError, Result},
    handlers::{check_comment_rate_limit, check_vote_rate_limit},
    models::{Comment, CommentThreadQuery, CreateCommentRequest, VoteRequest, VoteState, VoteTarget},
};

pub async fn get_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(params): Query<CommentThreadQuery>,
) -> Result<Json<Value>> {
    let sort = params.sort.unwrap_or_default();
    let comments = state.comments.get_comment_thread(post_id, sort).await?;

    Ok(Json(json!({
        "comments": comments,
        "post_id": post_id
    })))
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth_user: OptionalAuthUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let user_id = auth_user.user_id().ok_or(AppError::Unauthenticated)?;
    check_comment_rate_limit(&state, user_id).await?;

    let comment = state
        .comments
        .create_comment(Some(user_id), post_id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth_user: OptionalAuthUser,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<Value>> {
    state
        .comments
        .delete_comment(auth_user.user_id(), comment_id)
        .await?;

    Ok(Json(json!({
        "message": "Comment deleted successfully"
    })))
}

pub async fn get_comment_votes(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    auth_user: OptionalAuthUser,
) -> Result<Json<VoteState>> {
    state
        .store
        .fetch_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    let votes = state
        .votes
        .vote_state(comment_id, VoteTarget::Comment, auth_user.user_id())
        .await?;

    Ok(Json(votes))
}

pub async fn vote_comment(
    State(state): State<AppState>,
    auth_user: OptionalAuthUser,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteState>> {
    let user_id = auth_user.user_id().ok_or(AppError::Unauthenticated)?;
    check_vote_rate_limit(&state, user_id).await?;

    state
        .store
        .fetch_comment(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    let vote = state
        .votes
        .cast_vote(Some(user_id), comment_id, VoteTarget::Comment, payload.direction)
        .await?;

    Ok(Json(vote))
}
