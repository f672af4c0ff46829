use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{VoteAction, VoteDirection, VoteState, VoteTally, VoteTarget},
    store::EngagementStore,
};

type VoteKey = (Uuid, VoteTarget, Uuid);
type LockTable = Mutex<HashMap<VoteKey, Arc<tokio::sync::Mutex<()>>>>;

/// Casts votes and reports tallies.
///
/// Tallies are always recomputed from the full set of vote rows. Casts from
/// the same user on the same target run one at a time.
#[derive(Clone)]
pub struct VoteService {
    store: Arc<dyn EngagementStore>,
    in_flight: Arc<LockTable>,
}

/// A claim on one `(user, target)` lock. Dropping it, including when the
/// owning cast is cancelled, removes the table entry once nobody else holds
/// or waits on it.
struct InFlightVote<'a> {
    table: &'a LockTable,
    key: VoteKey,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for InFlightVote<'_> {
    fn drop(&mut self) {
        let Ok(mut in_flight) = self.table.lock() else {
            tracing::error!("Vote lock table poisoned, leaving entry in place");
            return;
        };
        if Arc::strong_count(&self.lock) == 2 {
            in_flight.remove(&self.key);
        }
    }
}

impl VoteService {
    pub fn new(store: Arc<dyn EngagementStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Toggle or switch `user_id`'s vote on a target.
    ///
    /// No vote inserts, the same direction removes, the other direction
    /// replaces in place. Exactly one store write is issued; if it fails the
    /// error is returned and the previous vote stays as it was.
    pub async fn cast_vote(
        &self,
        user_id: Option<Uuid>,
        target_id: Uuid,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> Result<VoteState> {
        let user_id = user_id.ok_or(AppError::Unauthenticated)?;

        let claim = self.lock_for((user_id, target, target_id))?;
        let _guard = claim.lock.lock().await;
        self.apply_vote(user_id, target_id, target, direction).await
    }

    async fn apply_vote(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        target: VoteTarget,
        direction: VoteDirection,
    ) -> Result<VoteState> {
        let rows = self.store.fetch_vote_rows(target_id, target).await?;
        let existing = rows
            .iter()
            .find(|row| row.user_id == user_id)
            .map(|row| row.direction);

        let action = match existing {
            None => {
                self.store
                    .upsert_vote(user_id, target_id, target, direction)
                    .await?;
                VoteAction::Inserted
            }
            Some(current) if current == direction => {
                self.store.delete_vote(user_id, target_id, target).await?;
                VoteAction::Removed
            }
            Some(_) => {
                self.store
                    .upsert_vote(user_id, target_id, target, direction)
                    .await?;
                VoteAction::Switched
            }
        };

        tracing::info!(
            "Vote {:?} by {} on {} {} ({:?})",
            action,
            user_id,
            target,
            target_id,
            direction
        );

        let mut state = self.vote_state(target_id, target, Some(user_id)).await?;
        state.action = Some(action);
        Ok(state)
    }

    /// Current tally plus the viewer's own vote, if any.
    pub async fn vote_state(
        &self,
        target_id: Uuid,
        target: VoteTarget,
        viewer_id: Option<Uuid>,
    ) -> Result<VoteState> {
        let rows = self.store.fetch_vote_rows(target_id, target).await?;
        Ok(VoteState::new(target_id, target, &rows, viewer_id))
    }

    pub async fn tally(&self, target_id: Uuid, target: VoteTarget) -> Result<VoteTally> {
        let rows = self.store.fetch_vote_rows(target_id, target).await?;
        Ok(VoteTally::from_rows(&rows))
    }

    pub async fn user_vote(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        target: VoteTarget,
    ) -> Result<Option<VoteDirection>> {
        let rows = self.store.fetch_vote_rows(target_id, target).await?;
        Ok(rows
            .iter()
            .find(|row| row.user_id == user_id)
            .map(|row| row.direction))
    }

    fn lock_for(&self, key: VoteKey) -> Result<InFlightVote<'_>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| AppError::Internal("Vote lock table poisoned".to_string()))?;
        let lock = in_flight.entry(key).or_default().clone();
        Ok(InFlightVote {
            table: &self.in_flight,
            key,
            lock,
        })
    }
}
