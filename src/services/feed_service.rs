use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;

use crate::{
    error::Result,
    models::{Feed, Post, PostFilter, PostRecord, PostSort, RankedPost, VoteTally, VoteTarget},
    services::ranking::{compare_ranked, rank_post, window_start},
    store::EngagementStore,
};

#[derive(Clone)]
pub struct FeedRanker {
    store: Arc<dyn EngagementStore>,
}

impl FeedRanker {
    pub fn new(store: Arc<dyn EngagementStore>) -> Self {
        Self { store }
    }

    pub async fn get_feed(&self, sort: PostSort, offset: u32, limit: u32) -> Result<Feed> {
        self.get_feed_at(sort, offset, limit, Utc::now()).await
    }

    /// Rank one page of posts as of `now`.
    ///
    /// The page is fetched newest-first and re-ranked on its own, so order
    /// only holds within a page. `has_more` is true whenever the page came back
    /// full.
    pub async fn get_feed_at(
        &self,
        sort: PostSort,
        offset: u32,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Feed> {
        let filter = PostFilter {
            created_after: window_start(sort, now),
        };

        let records = self.store.fetch_posts(&filter, offset, limit).await?;
        let has_more = records.len() == limit as usize;

        // One vote fetch and one comment count per post
        let posts = try_join_all(records.into_iter().map(|record| self.enrich(record))).await?;

        let mut scored: Vec<_> = posts
            .into_iter()
            .map(|post| (rank_post(&post, sort, now), post))
            .collect();

        // Stable, so equal keys keep fetch order
        scored.sort_by(|(a_rank, a), (b_rank, b)| {
            compare_ranked(*a_rank, a.created_at, *b_rank, b.created_at)
        });

        let ranked: Vec<RankedPost> = scored
            .into_iter()
            .map(|(rank, post)| RankedPost {
                rank_score: rank.value(),
                post,
            })
            .collect();

        tracing::debug!(
            "Ranked {:?} feed page at offset {}: {} posts, has_more={}",
            sort,
            offset,
            ranked.len(),
            has_more
        );

        Ok(Feed {
            posts: ranked,
            has_more,
        })
    }

    async fn enrich(&self, record: PostRecord) -> Result<Post> {
        let (rows, comment_count) = futures::try_join!(
            self.store.fetch_vote_rows(record.id, VoteTarget::Post),
            self.store.fetch_comment_count(record.id),
        )?;

        Ok(Post::enrich(
            record,
            VoteTally::from_rows(&rows),
            comment_count,
        ))
    }
}
