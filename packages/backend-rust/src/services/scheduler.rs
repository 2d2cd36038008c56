use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use repitis_algo::{MemoryError, MemoryModel, Rating, ReviewState};
use tracing::{debug, info};

use crate::cache::{keys, RedisCache};
use crate::db::operations::{commit_review, load_review_state, ReviewEventInput};
use crate::db::retry::{with_retry, RetryPolicy};
use crate::db::{Database, StoreError};
use crate::services::progress::local_day_index;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("rating must be between 1 and 4, got {0}")]
    InvalidRating(u8),
    #[error("card {0} is not the card currently presented")]
    StaleReview(String),
    #[error("card not found: {0}")]
    NotFound(String),
    #[error("review was written concurrently")]
    ConflictWriteFailed,
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("invalid memory state: {0}")]
    InvalidState(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for SchedulerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => SchedulerError::StorageUnavailable(msg),
            StoreError::Conflict => SchedulerError::ConflictWriteFailed,
            StoreError::Corrupt(msg) => SchedulerError::InvalidState(msg),
            StoreError::Sqlx(e) => SchedulerError::Storage(e.to_string()),
        }
    }
}

impl From<MemoryError> for SchedulerError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::InvalidRating(value) => SchedulerError::InvalidRating(value),
            other => SchedulerError::InvalidState(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewReceipt {
    pub state: ReviewState,
    pub interval_days: f64,
    pub was_new: bool,
    pub version: i64,
}

/// Applies ratings to stored memory state.
#[derive(Clone)]
pub struct Scheduler {
    db: Database,
    model: Arc<MemoryModel>,
    retry: RetryPolicy,
    cache: Option<RedisCache>,
    day_offset: FixedOffset,
}

impl Scheduler {
    pub fn new(db: Database, model: Arc<MemoryModel>, retry: RetryPolicy) -> Self {
        Self {
            db,
            model,
            retry,
            cache: None,
            day_offset: Utc.fix(),
        }
    }

    /// Cached stats are keyed by local day, so invalidation needs the offset.
    pub fn with_cache(mut self, cache: RedisCache, day_offset: FixedOffset) -> Self {
        self.cache = Some(cache);
        self.day_offset = day_offset;
        self
    }

    /// Loads the card's state, applies the rating and commits state and event
    /// together. A concurrent writer surfaces as
    /// [`SchedulerError::ConflictWriteFailed`] rather than being retried, so
    /// a rating is never applied twice.
    pub async fn record_review(
        &self,
        user_id: &str,
        card_id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<ReviewReceipt, SchedulerError> {
        let pool = self.db.pool();

        let stored = with_retry(&self.retry, "load_review_state", || {
            load_review_state(pool, user_id, card_id)
        })
        .await?;

        let previous = stored.as_ref().map(|row| &row.state);
        let outcome = self.model.update(previous, rating, now)?;

        let event = ReviewEventInput {
            user_id,
            card_id,
            rating: rating.value(),
            reviewed_at: now,
            was_new: outcome.was_new,
        };
        let expected_version = stored.as_ref().map(|row| row.version);
        let version = with_retry(&self.retry, "commit_review", || {
            commit_review(pool, expected_version, &outcome.state, &event)
        })
        .await?;

        if let Some(cache) = &self.cache {
            let day = local_day_index(now, self.day_offset);
            cache
                .delete_many(&keys::review_invalidated_keys(user_id, day))
                .await;
        }

        info!(
            user_id,
            card_id,
            rating = rating.value(),
            was_new = outcome.was_new,
            interval_days = format!("{:.2}", outcome.interval_days),
            "Review recorded"
        );
        debug!(
            stability = outcome.state.stability,
            difficulty = outcome.state.difficulty,
            retrievability = ?outcome.retrievability,
            version,
            "Memory state updated"
        );

        Ok(ReviewReceipt {
            state: outcome.state,
            interval_days: outcome.interval_days,
            was_new: outcome.was_new,
            version,
        })
    }
}
