//! Read-side aggregates: per-level mastery, streaks and daily counters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use repitis_algo::ReviewState;
use serde::{Deserialize, Serialize};

use crate::cache::{keys, RedisCache};
use crate::catalog::Catalog;
use crate::db::operations::{count_reviews, list_review_states, review_days};
use crate::db::retry::{with_retry, RetryPolicy};
use crate::db::{Database, StoreError};
use crate::services::mastery::{current_level, level_statuses, LevelStatus, MasteryPolicy};

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level_id: u32,
    pub level_name: String,
    pub total_cards: u32,
    pub mastered_cards: u32,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub today_reviews: i64,
    pub total_reviews: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub level_progress: Vec<LevelProgress>,
    pub current_level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodayStats {
    pub new_cards_today: i64,
    pub total_reviews_today: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelView {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub mastery_threshold: f64,
    pub is_unlocked: bool,
    pub progress_percentage: f64,
}

/// Everything card selection needs about one learner, read fresh from storage.
#[derive(Debug, Clone)]
pub struct LearnerSnapshot {
    pub states: HashMap<String, ReviewState>,
    pub statuses: Vec<LevelStatus>,
    pub new_cards_today: i64,
}

#[derive(Clone)]
pub struct ProgressAggregator {
    db: Database,
    catalog: Arc<Catalog>,
    mastery: MasteryPolicy,
    day_offset: FixedOffset,
    retry: RetryPolicy,
    cache: Option<RedisCache>,
    cache_ttl: Duration,
}

impl ProgressAggregator {
    pub fn new(
        db: Database,
        catalog: Arc<Catalog>,
        mastery: MasteryPolicy,
        day_offset: FixedOffset,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            db,
            catalog,
            mastery,
            day_offset,
            retry,
            cache: None,
            cache_ttl: Duration::from_secs(30),
        }
    }

    pub fn with_cache(mut self, cache: RedisCache, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    pub async fn snapshot(&self, user_id: &str, now: DateTime<Utc>) -> Result<LearnerSnapshot, StoreError> {
        let states = self.load_states(user_id).await?;
        let statuses = level_statuses(&self.catalog, &states, &self.mastery);
        let (from, to) = day_bounds(local_day_index(now, self.day_offset), self.day_offset);
        let pool = self.db.pool();
        let counts = with_retry(&self.retry, "count_reviews", || {
            count_reviews(pool, user_id, from, to)
        })
        .await?;

        Ok(LearnerSnapshot {
            states,
            statuses,
            new_cards_today: counts.new_in_range,
        })
    }

    pub async fn stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserStats, StoreError> {
        let today = local_day_index(now, self.day_offset);
        let key = keys::user_stats_key(user_id, today);
        if let Some(cached) = self.cached::<UserStats>(&key).await {
            return Ok(cached);
        }

        let pool = self.db.pool();
        let states = self.load_states(user_id).await?;
        let statuses = level_statuses(&self.catalog, &states, &self.mastery);

        let (from, to) = day_bounds(today, self.day_offset);
        let counts = with_retry(&self.retry, "count_reviews", || {
            count_reviews(pool, user_id, from, to)
        })
        .await?;
        let days = with_retry(&self.retry, "review_days", || {
            review_days(pool, user_id, self.day_offset)
        })
        .await?;

        let level_progress = statuses
            .iter()
            .filter_map(|status| {
                let level = self.catalog.level(status.level_id)?;
                Some(LevelProgress {
                    level_id: status.level_id,
                    level_name: level.name.clone(),
                    total_cards: status.total_cards,
                    mastered_cards: status.mastered_cards,
                    progress_percentage: status.progress_percentage,
                })
            })
            .collect();

        let stats = UserStats {
            today_reviews: counts.in_range,
            total_reviews: counts.total,
            current_streak: current_streak(&days, today),
            longest_streak: longest_streak(&days),
            level_progress,
            current_level: current_level(&statuses),
        };

        self.store(&key, &stats).await;
        Ok(stats)
    }

    pub async fn today_stats(&self, user_id: &str, now: DateTime<Utc>) -> Result<TodayStats, StoreError> {
        let today = local_day_index(now, self.day_offset);
        let key = keys::today_stats_key(user_id, today);
        if let Some(cached) = self.cached::<TodayStats>(&key).await {
            return Ok(cached);
        }

        let pool = self.db.pool();
        let (from, to) = day_bounds(today, self.day_offset);
        let counts = with_retry(&self.retry, "count_reviews", || {
            count_reviews(pool, user_id, from, to)
        })
        .await?;

        let stats = TodayStats {
            new_cards_today: counts.new_in_range,
            total_reviews_today: counts.in_range,
        };
        self.store(&key, &stats).await;
        Ok(stats)
    }

    pub async fn levels(&self, user_id: &str) -> Result<Vec<LevelView>, StoreError> {
        let key = keys::levels_key(user_id);
        if let Some(cached) = self.cached::<Vec<LevelView>>(&key).await {
            return Ok(cached);
        }

        let states = self.load_states(user_id).await?;
        let statuses = level_statuses(&self.catalog, &states, &self.mastery);
        let views: Vec<LevelView> = self
            .catalog
            .levels()
            .iter()
            .zip(statuses.iter())
            .map(|(level, status)| LevelView {
                id: level.id,
                name: level.name.clone(),
                description: level.description.clone(),
                mastery_threshold: level.mastery_threshold,
                is_unlocked: status.is_unlocked,
                progress_percentage: status.progress_percentage,
            })
            .collect();

        self.store(&key, &views).await;
        Ok(views)
    }

    async fn load_states(&self, user_id: &str) -> Result<HashMap<String, ReviewState>, StoreError> {
        let pool = self.db.pool();
        let rows = with_retry(&self.retry, "list_review_states", || {
            list_review_states(pool, user_id)
        })
        .await?;
        Ok(rows.into_iter().map(|row| (row.card_id, row.state)).collect())
    }

    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match &self.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        if let Some(cache) = &self.cache {
            cache.set(key, value, self.cache_ttl).await;
        }
    }
}

/// Days since the epoch in the learner's fixed offset
pub fn local_day_index(at: DateTime<Utc>, offset: FixedOffset) -> i64 {
    let offset_ms = i64::from(offset.local_minus_utc()) * 1000;
    (at.timestamp_millis() + offset_ms).div_euclid(DAY_MS)
}

/// UTC instants `[start, end)` of a local day
pub fn day_bounds(day: i64, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let offset_ms = i64::from(offset.local_minus_utc()) * 1000;
    let start_ms = day * DAY_MS - offset_ms;
    let start = DateTime::from_timestamp_millis(start_ms).unwrap_or_default();
    let end = DateTime::from_timestamp_millis(start_ms + DAY_MS).unwrap_or_default();
    (start, end)
}

/// Consecutive review days counted back from today. A day without reviews
/// breaks the run, today included. `days` must be ascending and distinct.
pub fn current_streak(days: &[i64], today: i64) -> u32 {
    let mut expected = today;
    let mut streak = 0;
    for &day in days.iter().rev() {
        if day > expected {
            continue;
        }
        if day != expected {
            break;
        }
        streak += 1;
        expected -= 1;
    }
    streak
}

/// Longest run of consecutive days. `days` must be ascending and distinct.
pub fn longest_streak(days: &[i64]) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<i64> = None;
    for &day in days {
        run = match previous {
            Some(prev) if day == prev + 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn cst() -> FixedOffset {
        FixedOffset::east_opt(-6 * 3600).unwrap()
    }

    #[test]
    fn test_streak_stops_at_gap() {
        let d = 20_000;
        assert_eq!(current_streak(&[d - 5, d - 2, d - 1, d], d), 3);
        assert_eq!(current_streak(&[d - 4, d - 3, d - 2, d - 1, d], d), 5);
    }

    #[test]
    fn test_streak_is_zero_until_today_has_a_review() {
        let d = 20_000;
        assert_eq!(current_streak(&[d - 2, d - 1], d), 0);
        assert_eq!(current_streak(&[d - 2, d - 1], d - 1), 2);
        assert_eq!(current_streak(&[d - 3, d - 2], d), 0);
        assert_eq!(current_streak(&[], d), 0);
    }

    #[test]
    fn test_longest_streak() {
        assert_eq!(longest_streak(&[]), 0);
        assert_eq!(longest_streak(&[1]), 1);
        assert_eq!(longest_streak(&[1, 2, 3, 7, 8, 10]), 3);
        assert_eq!(longest_streak(&[1, 3, 4, 5, 6]), 4);
    }

    #[test]
    fn test_local_day_uses_offset() {
        // 03:00 UTC is still the previous evening in UTC-6.
        let late = Utc.with_ymd_and_hms(2026, 3, 11, 3, 0, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(local_day_index(late, cst()), local_day_index(late, utc) - 1);

        let (start, end) = day_bounds(local_day_index(late, cst()), cst());
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 10, 6, 0, 0).unwrap());
        assert_eq!(end - start, chrono::Duration::days(1));
        assert!(start <= late && late < end);
    }

    proptest! {
        #[test]
        fn prop_current_never_exceeds_longest(
            raw in prop::collection::btree_set(0i64..60, 0..40),
            today in 0i64..62,
        ) {
            let days: Vec<i64> = raw.into_iter().filter(|&d| d <= today).collect();
            prop_assert!(current_streak(&days, today) <= longest_streak(&days));
        }

        #[test]
        fn prop_day_bounds_contain_instant(ms in 0i64..4_000_000_000_000, offset_h in -12i32..=14) {
            let offset = FixedOffset::east_opt(offset_h * 3600).unwrap();
            let at = DateTime::from_timestamp_millis(ms).unwrap();
            let (start, end) = day_bounds(local_day_index(at, offset), offset);
            prop_assert!(start <= at && at < end);
        }
    }
}
