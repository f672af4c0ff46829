use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{
        Comment, CommentNode, CommentRecord, CommentSort, CreateCommentRequest, VoteTally,
        VoteTarget,
    },
    services::comment_tree::{build_tree, sort_tree},
    store::EngagementStore,
};

/// Deepest reply level accepted on create; top-level comments are level 0.
pub const MAX_REPLY_DEPTH: usize = 32;

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn EngagementStore>,
}

impl CommentService {
    pub fn new(store: Arc<dyn EngagementStore>) -> Self {
        Self { store }
    }

    /// Every comment on a post, nested and ordered by `sort` at each depth.
    pub async fn get_comment_thread(
        &self,
        post_id: Uuid,
        sort: CommentSort,
    ) -> Result<Vec<CommentNode>> {
        self.store
            .fetch_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let records = self.store.fetch_comments(post_id).await?;
        let comments = try_join_all(records.into_iter().map(|record| self.enrich(record))).await?;

        Ok(sort_tree(build_tree(comments), sort))
    }

    pub async fn create_comment(
        &self,
        author_id: Option<Uuid>,
        post_id: Uuid,
        request: &CreateCommentRequest,
    ) -> Result<Comment> {
        let author_id = author_id.ok_or(AppError::Unauthenticated)?;
        request.validate()?;

        self.store
            .fetch_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        // If replying to a comment, it must exist on the same post
        if let Some(parent_id) = request.parent_id {
            let parent = self.store.fetch_comment(parent_id).await?;
            match parent {
                Some(parent) if parent.post_id == post_id => self.check_reply_depth(&parent).await?,
                Some(_) => {
                    return Err(AppError::MalformedReference(
                        "Parent comment is not on the same post".to_string(),
                    ));
                }
                None => {
                    return Err(AppError::MalformedReference(
                        "Parent comment not found".to_string(),
                    ));
                }
            }
        }

        let record = CommentRecord {
            id: Uuid::new_v4(),
            post_id,
            parent_id: request.parent_id,
            author_id,
            content: request.content.clone(),
            is_deleted: false,
            created_at: Utc::now(),
        };
        self.store.insert_comment(&record).await?;

        tracing::info!("Comment {} created on post {}", record.id, post_id);
        Ok(Comment::enrich(record, 0))
    }

    /// Tombstone a comment. Only its author may do this.
    pub async fn delete_comment(&self, user_id: Option<Uuid>, comment_id: Uuid) -> Result<()> {
        let user_id = user_id.ok_or(AppError::Unauthenticated)?;

        let comment = self
            .store
            .fetch_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        if comment.author_id != user_id {
            return Err(AppError::Authorization(
                "Only the author can delete this comment".to_string(),
            ));
        }

        if !self.store.soft_delete_comment(comment_id).await? {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }

        tracing::info!("Comment {} soft-deleted", comment_id);
        Ok(())
    }

    async fn check_reply_depth(&self, parent: &CommentRecord) -> Result<()> {
        let mut depth = 1;
        let mut ancestor = parent.parent_id;
        while let Some(ancestor_id) = ancestor {
            depth += 1;
            if depth > MAX_REPLY_DEPTH {
                return Err(AppError::BadRequest(format!(
                    "Replies cannot nest more than {} levels deep",
                    MAX_REPLY_DEPTH
                )));
            }
            ancestor = self
                .store
                .fetch_comment(ancestor_id)
                .await?
                .and_then(|comment| comment.parent_id);
        }
        Ok(())
    }

    async fn enrich(&self, record: CommentRecord) -> Result<Comment> {
        let rows = self
            .store
            .fetch_vote_rows(record.id, VoteTarget::Comment)
            .await?;
        Ok(Comment::enrich(record, VoteTally::from_rows(&rows).score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{DELETED_CONTENT, PostRecord, VoteDirection},
        store::MemoryEngagementStore,
    };

    async fn setup() -> (Arc<MemoryEngagementStore>, CommentService, Uuid) {
        let store = Arc::new(MemoryEngagementStore::new());
        let post_id = Uuid::new_v4();
        store
            .insert_post(PostRecord {
                id: post_id,
                author_id: Uuid::new_v4(),
                title: "Which dorm is quietest?".to_string(),
                created_at: Utc::now(),
            })
            .await;
        (store.clone(), CommentService::new(store), post_id)
    }

    fn reply(content: &str, parent_id: Option<Uuid>) -> CreateCommentRequest {
        CreateCommentRequest {
            content: content.to_string(),
            parent_id,
        }
    }

    #[tokio::test]
    async fn thread_nests_replies_and_orders_by_votes() {
        let (store, comments, post_id) = setup().await;
        let author = Some(Uuid::new_v4());

        let quiet = comments
            .create_comment(author, post_id, &reply("North hall", None))
            .await
            .unwrap();
        let loud = comments
            .create_comment(author, post_id, &reply("Avoid East", None))
            .await
            .unwrap();
        let nested = comments
            .create_comment(author, post_id, &reply("Agreed", Some(quiet.id)))
            .await
            .unwrap();

        for _ in 0..3 {
            store
                .upsert_vote(Uuid::new_v4(), loud.id, VoteTarget::Comment, VoteDirection::Up)
                .await
                .unwrap();
        }

        let thread = comments
            .get_comment_thread(post_id, CommentSort::Top)
            .await
            .unwrap();

        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].comment.id, loud.id);
        assert_eq!(thread[0].comment.vote_score, 3);
        assert_eq!(thread[1].comment.id, quiet.id);
        assert_eq!(thread[1].replies[0].comment.id, nested.id);
    }

    #[tokio::test]
    async fn deleted_comment_stays_in_thread_as_tombstone() {
        let (_store, comments, post_id) = setup().await;
        let author = Uuid::new_v4();

        let parent = comments
            .create_comment(Some(author), post_id, &reply("I regret this", None))
            .await
            .unwrap();
        comments
            .create_comment(Some(Uuid::new_v4()), post_id, &reply("Why?", Some(parent.id)))
            .await
            .unwrap();

        comments.delete_comment(Some(author), parent.id).await.unwrap();

        let thread = comments
            .get_comment_thread(post_id, CommentSort::New)
            .await
            .unwrap();
        assert_eq!(thread.len(), 1);
        assert!(thread[0].comment.is_deleted);
        assert_eq!(thread[0].comment.content, DELETED_CONTENT);
        assert_eq!(thread[0].replies.len(), 1);
    }

    #[tokio::test]
    async fn reply_to_foreign_or_missing_parent_is_rejected() {
        let (store, comments, post_id) = setup().await;
        let other_post = Uuid::new_v4();
        store
            .insert_post(PostRecord {
                id: other_post,
                author_id: Uuid::new_v4(),
                title: "Other".to_string(),
                created_at: Utc::now(),
            })
            .await;
        let elsewhere = comments
            .create_comment(Some(Uuid::new_v4()), other_post, &reply("Elsewhere", None))
            .await
            .unwrap();

        let foreign = comments
            .create_comment(
                Some(Uuid::new_v4()),
                post_id,
                &reply("Cross-post", Some(elsewhere.id)),
            )
            .await
            .unwrap_err();
        assert!(matches!(foreign, AppError::MalformedReference(_)));

        let missing = comments
            .create_comment(
                Some(Uuid::new_v4()),
                post_id,
                &reply("Ghost", Some(Uuid::new_v4())),
            )
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::MalformedReference(_)));
    }

    #[tokio::test]
    async fn writes_require_identity_and_ownership() {
        let (_store, comments, post_id) = setup().await;

        let anonymous = comments
            .create_comment(None, post_id, &reply("hi", None))
            .await
            .unwrap_err();
        assert!(matches!(anonymous, AppError::Unauthenticated));

        let mine = comments
            .create_comment(Some(Uuid::new_v4()), post_id, &reply("mine", None))
            .await
            .unwrap();
        let err = comments
            .delete_comment(Some(Uuid::new_v4()), mine.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let empty = comments
            .create_comment(Some(Uuid::new_v4()), post_id, &reply("", None))
            .await
            .unwrap_err();
        assert!(matches!(empty, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn replies_past_the_depth_cap_are_rejected() {
        let (_store, comments, post_id) = setup().await;
        let author = Some(Uuid::new_v4());

        let mut parent = comments
            .create_comment(author, post_id, &reply("level 0", None))
            .await
            .unwrap();
        for level in 1..=MAX_REPLY_DEPTH {
            parent = comments
                .create_comment(author, post_id, &reply(&format!("level {level}"), Some(parent.id)))
                .await
                .unwrap();
        }

        let err = comments
            .create_comment(author, post_id, &reply("one too deep", Some(parent.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let thread = comments
            .get_comment_thread(post_id, CommentSort::Old)
            .await
            .unwrap();
        assert_eq!(thread.len(), 1);
    }

    #[tokio::test]
    async fn thread_for_unknown_post_is_not_found() {
        let (_store, comments, _post_id) = setup().await;
        let err = comments
            .get_comment_thread(Uuid::new_v4(), CommentSort::Top)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
