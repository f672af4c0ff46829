pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod redis;
pub mod services;
pub mod store;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    redis::RedisClient,
    services::{CommentService, FeedRanker, VoteService},
    store::EngagementStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EngagementStore>,
    pub feed: FeedRanker,
    pub votes: VoteService,
    pub comments: CommentService,
    pub redis: Option<Arc<RedisClient>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EngagementStore>,
        redis: Option<Arc<RedisClient>>,
        config: Config,
    ) -> Self {
        Self {
            feed: FeedRanker::new(store.clone()),
            votes: VoteService::new(store.clone()),
            comments: CommentService::new(store.clone()),
            store,
            redis,
            config: Arc::new(config),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid allowed origin {:?}", origin);
                        None
                    }
                })
                .collect::<Vec<_>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    let routes = Router::new()
        // Feed
        .route("/api/posts", get(handlers::posts::get_posts))
        .route(
            "/api/posts/{post_id}/votes",
            get(handlers::posts::get_post_votes),
        )
        .route(
            "/api/posts/{post_id}/vote",
            post(handlers::posts::vote_post),
        )
        // Comments
        .route(
            "/api/posts/{post_id}/comments",
            get(handlers::comments::get_post_comments).post(handlers::comments::create_comment),
        )
        .route(
            "/api/comments/{comment_id}",
            delete(handlers::comments::delete_comment),
        )
        .route(
            "/api/comments/{comment_id}/votes",
            get(handlers::comments::get_comment_votes),
        )
        .route(
            "/api/comments/{comment_id}/vote",
            post(handlers::comments::vote_comment),
        );

    Router::new()
        .merge(routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
