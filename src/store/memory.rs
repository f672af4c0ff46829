use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        CommentRecord, DELETED_CONTENT, PostFilter, PostRecord, VoteDirection, VoteRow, VoteTarget,
    },
    store::EngagementStore,
};

#[derive(Default)]
struct Tables {
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    votes: HashMap<(VoteTarget, Uuid), Vec<VoteRow>>,
}

/// In-process store used for development and tests.
#[derive(Default)]
pub struct MemoryEngagementStore {
    tables: RwLock<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryEngagementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_post(&self, post: PostRecord) {
        self.tables.write().await.posts.push(post);
    }

    /// Make every subsequent read fail with `StoreUnavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with `StoreUnavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("read rejected".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EngagementStore for MemoryEngagementStore {
    async fn fetch_posts(
        &self,
        filter: &PostFilter,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<PostRecord>> {
        self.check_read()?;
        let tables = self.tables.read().await;

        let mut posts: Vec<PostRecord> = tables
            .posts
            .iter()
            .filter(|post| {
                filter
                    .created_after
                    .is_none_or(|after| post.created_at >= after)
            })
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn fetch_post(&self, post_id: Uuid) -> Result<Option<PostRecord>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|post| post.id == post_id).cloned())
    }

    async fn fetch_vote_rows(&self, target_id: Uuid, target: VoteTarget) -> Result<Vec<VoteRow>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .get(&(target, target_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_comment_count(&self, post_id: Uuid) -> Result<i64> {
        self.check_read()?;
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .count() as i64)
    }

    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>> {
        self.check_read()?;
        let tables = self.tables.read().await;

        let mut comments: Vec<CommentRecord> = tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(comments)
    }

    async fn fetch_comment(&self, comment_id: Uuid) -> Result<Option<CommentRecord>> {
        self.check_read()?;
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .find(|comment| comment.id == comment_id)
            .cloned())
    }

    async fn insert_comment(&self, comment: &CommentRecord) -> Result<()> {
        self.check_write()?;
        self.tables.write().await.comments.push(comment.clone());
        Ok(())
    }

    async fn soft_delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        self.check_write()?;
        let mut tables = self.tables.write().await;

        let Some(comment) = tables
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
        else {
            return Ok(false);
        };

        comment.is_deleted = true;
        comment.content = DELETED_CONTENT.to_string();
        Ok(true)
    }

    async fn upsert_vote(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> Result<()> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        let rows = tables.votes.entry((target, target_id)).or_default();

        match rows.iter_mut().find(|row| row.user_id == user_id) {
            Some(row) => row.direction = direction,
            None => rows.push(VoteRow { user_id, direction }),
        }
        Ok(())
    }

    async fn delete_vote(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        target: VoteTarget,
    ) -> Result<()> {
        self.check_write()?;
        let mut tables = self.tables.write().await;

        if let Some(rows) = tables.votes.get_mut(&(target, target_id)) {
            rows.retain(|row| row.user_id != user_id);
        }
        Ok(())
    }
}
