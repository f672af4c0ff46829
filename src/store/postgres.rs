use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    error::Result,
    models::{
        CommentRecord, DELETED_CONTENT, PostFilter, PostRecord, StoredVote, VoteDirection,
        VoteRow, VoteTarget,
    },
    store::EngagementStore,
};

#[derive(Clone)]
pub struct PgEngagementStore {
    db: PgPool,
}

impl PgEngagementStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

// Table and foreign-key column for each vote target
fn vote_table(target: VoteTarget) -> (&'static str, &'static str) {
    match target {
        VoteTarget::Post => ("post_votes", "post_id"),
        VoteTarget::Comment => ("comment_votes", "comment_id"),
    }
}

#[async_trait]
impl EngagementStore for PgEngagementStore {
    async fn fetch_posts(
        &self,
        filter: &PostFilter,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<PostRecord>> {
        let posts = sqlx::query_as::<_, PostRecord>(
            r#"
            SELECT id, author_id, title, created_at
            FROM posts
            WHERE ($1::TIMESTAMPTZ IS NULL OR created_at >= $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.created_after)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.db)
        .await?;

        Ok(posts)
    }

    async fn fetch_post(&self, post_id: Uuid) -> Result<Option<PostRecord>> {
        let post = sqlx::query_as::<_, PostRecord>(
            "SELECT id, author_id, title, created_at FROM posts WHERE id = $1",
        )
        .bind(post_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(post)
    }

    async fn fetch_vote_rows(&self, target_id: Uuid, target: VoteTarget) -> Result<Vec<VoteRow>> {
        let (table, column) = vote_table(target);
        let query = format!(
            r#"
            SELECT id, user_id, {column} AS target_id, vote_type, created_at, updated_at
            FROM {table}
            WHERE {column} = $1
            ORDER BY created_at
            "#
        );

        let stored = sqlx::query_as::<_, StoredVote>(&query)
            .bind(target_id)
            .fetch_all(&self.db)
            .await?;

        Ok(stored
            .into_iter()
            .filter_map(|vote| match VoteDirection::from_i16(vote.vote_type) {
                Some(direction) => Some(VoteRow {
                    user_id: vote.user_id,
                    direction,
                }),
                None => {
                    tracing::warn!(
                        "Ignoring {} vote {} with vote_type {}",
                        target,
                        vote.id,
                        vote.vote_type
                    );
                    None
                }
            })
            .collect())
    }

    async fn fetch_comment_count(&self, post_id: Uuid) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.db)
            .await?;

        Ok(row.get::<i64, _>("count"))
    }

    async fn fetch_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>> {
        let comments = sqlx::query_as::<_, CommentRecord>(
            r#"
            SELECT id, post_id, parent_id, author_id, content, is_deleted, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.db)
        .await?;

        Ok(comments)
    }

    async fn fetch_comment(&self, comment_id: Uuid) -> Result<Option<CommentRecord>> {
        let comment = sqlx::query_as::<_, CommentRecord>(
            r#"
            SELECT id, post_id, parent_id, author_id, content, is_deleted, created_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(comment_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(comment)
    }

    async fn insert_comment(&self, comment: &CommentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, parent_id, author_id, content, is_deleted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.parent_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.is_deleted)
        .bind(comment.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn soft_delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        // Soft delete - keep the row so replies stay attached
        let result = sqlx::query(
            r#"
            UPDATE comments
            SET is_deleted = true, content = $2
            WHERE id = $1
            "#,
        )
        .bind(comment_id)
        .bind(DELETED_CONTENT)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_vote(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> Result<()> {
        let (table, column) = vote_table(target);
        let query = format!(
            r#"
            INSERT INTO {table} (id, user_id, {column}, vote_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (user_id, {column})
            DO UPDATE SET vote_type = $4, updated_at = NOW()
            "#
        );

        sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(target_id)
            .bind(direction.as_i16())
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn delete_vote(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        target: VoteTarget,
    ) -> Result<()> {
        let (table, column) = vote_table(target);
        let query = format!("DELETE FROM {table} WHERE user_id = $1 AND {column} = $2");

        sqlx::query(&query)
            .bind(user_id)
            .bind(target_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
