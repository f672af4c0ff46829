//! Access to raw engagement facts.
//!
//! Everything above this layer works with whole vote-row sets and recomputes
//! tallies from them; stores never keep running counters.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{CommentRecord, PostFilter, PostRecord, VoteDirection, VoteRow, VoteTarget},
};

pub use memory::MemoryEngagementStore;
pub use postgres::PgEngagementStore;

#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Posts newest-first, narrowed by `filter`, windowed by `offset`/`limit`.
    async fn fetch_posts(
        &self,
        filter: &PostFilter,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<PostRecord>>;

    async fn fetch_post(&self, post_id: Uuid) -> Result<Option<PostRecord>>;

    async fn fetch_vote_rows(&self, target_id: Uuid, target: VoteTarget) -> Result<Vec<VoteRow>>;

    async fn fetch_comment_count(&self, post_id: Uuid) -> Result<i64>;

    /// Every comment on a post, deleted ones included, oldest first.
    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>>;

    async fn fetch_comment(&self, comment_id: Uuid) -> Result<Option<CommentRecord>>;

    async fn insert_comment(&self, comment: &CommentRecord) -> Result<()>;

    /// Tombstone a comment in place. Returns false if it does not exist.
    async fn soft_delete_comment(&self, comment_id: Uuid) -> Result<bool>;

    async fn upsert_vote(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> Result<()>;

    async fn delete_vote(&self, user_id: Uuid, target_id: Uuid, target: VoteTarget)
    -> Result<()>;
}
