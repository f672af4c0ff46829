use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use campus_forum::{
    AppState,
    auth::Claims,
    config::Config,
    create_app,
    models::{PostRecord, VoteDirection, VoteTarget},
    store::{EngagementStore, MemoryEngagementStore},
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-secret";

fn app(store: Arc<MemoryEngagementStore>) -> Router {
    let config = Config {
        jwt_secret: SECRET.to_string(),
        default_page_size: 2,
        ..Config::default()
    };
    create_app(AppState::new(store, None, config))
}

fn bearer(user_id: Uuid) -> String {
    let (token, _) = Claims::new(user_id, SECRET).unwrap();
    format!("Bearer {token}")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn seed_post(store: &MemoryEngagementStore, title: &str, minutes_ago: i64) -> Uuid {
    let id = Uuid::new_v4();
    store
        .insert_post(PostRecord {
            id,
            author_id: Uuid::new_v4(),
            title: title.to_string(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        })
        .await;
    id
}

#[tokio::test]
async fn feed_pages_with_has_more() {
    let store = Arc::new(MemoryEngagementStore::new());
    for (title, minutes) in [("first", 1), ("second", 2), ("third", 3)] {
        seed_post(&store, title, minutes).await;
    }

    let (status, body) = send(
        app(store.clone()),
        Request::get("/api/posts?sort=new").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"][0]["title"], "first");
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["has_more"], true);

    let (_, body) = send(
        app(store),
        Request::get("/api/posts?sort=new&page=2")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    assert_eq!(body["posts"][0]["title"], "third");
    assert_eq!(body["pagination"]["has_more"], false);
}

#[tokio::test]
async fn page_zero_is_rejected() {
    let store = Arc::new(MemoryEngagementStore::new());
    let (status, _) = send(
        app(store),
        Request::get("/api/posts?page=0").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn anonymous_vote_is_unauthorized_and_not_recorded() {
    let store = Arc::new(MemoryEngagementStore::new());
    let post_id = seed_post(&store, "vote on me", 5).await;

    let (status, body) = send(
        app(store.clone()),
        post_json(
            &format!("/api/posts/{post_id}/vote"),
            None,
            json!({ "direction": "up" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);
    assert!(
        store
            .fetch_vote_rows(post_id, VoteTarget::Post)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn vote_toggles_through_the_api() {
    let store = Arc::new(MemoryEngagementStore::new());
    let post_id = seed_post(&store, "toggle", 5).await;
    let user = Uuid::new_v4();
    let auth = bearer(user);
    let uri = format!("/api/posts/{post_id}/vote");

    let (status, body) = send(
        app(store.clone()),
        post_json(&uri, Some(&auth), json!({ "direction": "up" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_vote"], "up");
    assert_eq!(body["score"], 1);
    assert_eq!(body["action"], "inserted");

    let (_, body) = send(
        app(store.clone()),
        post_json(&uri, Some(&auth), json!({ "direction": "down" })),
    )
    .await;
    assert_eq!(body["user_vote"], "down");
    assert_eq!(body["score"], -1);
    assert_eq!(body["action"], "switched");

    let (_, body) = send(
        app(store.clone()),
        post_json(&uri, Some(&auth), json!({ "direction": "down" })),
    )
    .await;
    assert_eq!(body["user_vote"], Value::Null);
    assert_eq!(body["score"], 0);
    assert_eq!(body["action"], "removed");

    let (status, body) = send(
        app(store),
        Request::get(format!("/api/posts/{post_id}/votes"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upvotes"], 0);
    assert_eq!(body["downvotes"], 0);
}

#[tokio::test]
async fn vote_on_missing_post_is_not_found() {
    let store = Arc::new(MemoryEngagementStore::new());
    let (status, _) = send(
        app(store),
        post_json(
            &format!("/api/posts/{}/vote", Uuid::new_v4()),
            Some(&bearer(Uuid::new_v4())),
            json!({ "direction": "up" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_thread_round_trip() {
    let store = Arc::new(MemoryEngagementStore::new());
    let post_id = seed_post(&store, "thread", 5).await;
    let author = Uuid::new_v4();
    let comments_uri = format!("/api/posts/{post_id}/comments");

    let (status, parent) = send(
        app(store.clone()),
        post_json(
            &comments_uri,
            Some(&bearer(author)),
            json!({ "content": "Is the library open late?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let parent_id = parent["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        app(store.clone()),
        post_json(
            &comments_uri,
            Some(&bearer(Uuid::new_v4())),
            json!({ "content": "Until 2am on weekdays", "parent_id": parent_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        app(store.clone()),
        post_json(
            &format!("/api/comments/{parent_id}/vote"),
            Some(&bearer(Uuid::new_v4())),
            json!({ "direction": "up" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app(store.clone()),
        Request::delete(format!("/api/comments/{parent_id}"))
            .header(header::AUTHORIZATION, bearer(author))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app(store.clone()),
        Request::get(format!("{comments_uri}?sort=top"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let roots = body["comments"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["is_deleted"], true);
    assert_eq!(roots[0]["content"], "[deleted]");
    assert_eq!(roots[0]["vote_score"], 1);
    assert_eq!(roots[0]["replies"][0]["content"], "Until 2am on weekdays");

    // Post feed counts every comment, tombstones included
    let (_, feed) = send(
        app(store.clone()),
        Request::get("/api/posts?sort=hot").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(feed["posts"][0]["comment_count"], 2);

    let comment_rows = store
        .fetch_vote_rows(parent_id.parse().unwrap(), VoteTarget::Comment)
        .await
        .unwrap();
    assert_eq!(comment_rows.len(), 1);
    assert_eq!(comment_rows[0].direction, VoteDirection::Up);
}

#[tokio::test]
async fn reply_to_unknown_parent_is_unprocessable() {
    let store = Arc::new(MemoryEngagementStore::new());
    let post_id = seed_post(&store, "thread", 5).await;

    let (status, _) = send(
        app(store),
        post_json(
            &format!("/api/posts/{post_id}/comments"),
            Some(&bearer(Uuid::new_v4())),
            json!({ "content": "hello?", "parent_id": Uuid::new_v4() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn store_outage_reports_service_unavailable() {
    let store = Arc::new(MemoryEngagementStore::new());
    seed_post(&store, "down", 5).await;
    store.set_fail_reads(true);

    let (status, body) = send(
        app(store),
        Request::get("/api/posts").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Store unavailable");
}

#[tokio::test]
async fn anonymous_writes_on_missing_targets_are_unauthorized() {
    let store = Arc::new(MemoryEngagementStore::new());
    let missing = Uuid::new_v4();

    for uri in [
        format!("/api/posts/{missing}/vote"),
        format!("/api/comments/{missing}/vote"),
    ] {
        let (status, _) = send(
            app(store.clone()),
            post_json(&uri, None, json!({ "direction": "up" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }

    let (status, _) = send(
        app(store),
        post_json(
            &format!("/api/posts/{missing}/comments"),
            None,
            json!({ "content": "hello" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
