use chrono::{DateTime, FixedOffset, Utc};
use repitis_algo::ReviewState;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::StoreError;

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredReviewState {
    pub card_id: String,
    pub state: ReviewState,
    /// Optimistic concurrency token, bumped on every update
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct ReviewEventInput<'a> {
    pub user_id: &'a str,
    pub card_id: &'a str,
    pub rating: u8,
    pub reviewed_at: DateTime<Utc>,
    pub was_new: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewCounts {
    pub total: i64,
    pub in_range: i64,
    pub new_in_range: i64,
}

pub async fn load_review_state(
    pool: &SqlitePool,
    user_id: &str,
    card_id: &str,
) -> Result<Option<StoredReviewState>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT "card_id", "stability", "difficulty", "due_at_ms", "last_reviewed_at_ms",
               "review_count", "lapse_count", "version"
        FROM "review_states"
        WHERE "user_id" = ? AND "card_id" = ?
        "#,
    )
    .bind(user_id)
    .bind(card_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_state_row).transpose()
}

pub async fn list_review_states(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<StoredReviewState>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT "card_id", "stability", "difficulty", "due_at_ms", "last_reviewed_at_ms",
               "review_count", "lapse_count", "version"
        FROM "review_states"
        WHERE "user_id" = ?
        ORDER BY "due_at_ms" ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_state_row).collect()
}

/// Writes the new state and its event in one transaction.
///
/// `expected_version` is `None` for a first review (insert) and the loaded
/// version otherwise. Returns the stored version. A lost race on either path
/// rolls back and yields [`StoreError::Conflict`].
pub async fn commit_review(
    pool: &SqlitePool,
    expected_version: Option<i64>,
    state: &ReviewState,
    event: &ReviewEventInput<'_>,
) -> Result<i64, StoreError> {
    let mut tx = pool.begin().await?;

    let due_at_ms = state.due_at.timestamp_millis();
    let last_reviewed_at_ms = state.last_reviewed_at.map(|at| at.timestamp_millis());

    let (result, version) = match expected_version {
        None => {
            let result = sqlx::query(
                r#"
                INSERT INTO "review_states"
                    ("user_id", "card_id", "stability", "difficulty", "due_at_ms",
                     "last_reviewed_at_ms", "review_count", "lapse_count", "version")
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)
                ON CONFLICT ("user_id", "card_id") DO NOTHING
                "#,
            )
            .bind(event.user_id)
            .bind(event.card_id)
            .bind(state.stability)
            .bind(state.difficulty)
            .bind(due_at_ms)
            .bind(last_reviewed_at_ms)
            .bind(i64::from(state.review_count))
            .bind(i64::from(state.lapse_count))
            .execute(&mut *tx)
            .await?;
            (result, 1)
        }
        Some(expected) => {
            let result = sqlx::query(
                r#"
                UPDATE "review_states"
                SET "stability" = ?, "difficulty" = ?, "due_at_ms" = ?,
                    "last_reviewed_at_ms" = ?, "review_count" = ?, "lapse_count" = ?,
                    "version" = "version" + 1
                WHERE "user_id" = ? AND "card_id" = ? AND "version" = ?
                "#,
            )
            .bind(state.stability)
            .bind(state.difficulty)
            .bind(due_at_ms)
            .bind(last_reviewed_at_ms)
            .bind(i64::from(state.review_count))
            .bind(i64::from(state.lapse_count))
            .bind(event.user_id)
            .bind(event.card_id)
            .bind(expected)
            .execute(&mut *tx)
            .await?;
            (result, expected + 1)
        }
    };

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(StoreError::Conflict);
    }

    sqlx::query(
        r#"
        INSERT INTO "review_events"
            ("id", "user_id", "card_id", "rating", "reviewed_at_ms", "due_at_ms",
             "was_new", "stability_after", "difficulty_after")
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(event.user_id)
    .bind(event.card_id)
    .bind(i64::from(event.rating))
    .bind(event.reviewed_at.timestamp_millis())
    .bind(due_at_ms)
    .bind(event.was_new)
    .bind(state.stability)
    .bind(state.difficulty)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(version)
}

/// Total reviews, plus reviews and first reviews within `[from, to)`.
pub async fn count_reviews(
    pool: &SqlitePool,
    user_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<ReviewCounts, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS "total",
            COALESCE(SUM(CASE WHEN "reviewed_at_ms" >= ? AND "reviewed_at_ms" < ? THEN 1 ELSE 0 END), 0) AS "in_range",
            COALESCE(SUM(CASE WHEN "reviewed_at_ms" >= ? AND "reviewed_at_ms" < ? AND "was_new" = 1 THEN 1 ELSE 0 END), 0) AS "new_in_range"
        FROM "review_events"
        WHERE "user_id" = ?
        "#,
    )
    .bind(from.timestamp_millis())
    .bind(to.timestamp_millis())
    .bind(from.timestamp_millis())
    .bind(to.timestamp_millis())
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(ReviewCounts {
        total: row.try_get("total")?,
        in_range: row.try_get("in_range")?,
        new_in_range: row.try_get("new_in_range")?,
    })
}

/// Distinct local calendar days (days since the epoch in `offset`) with at
/// least one review, ascending.
pub async fn review_days(
    pool: &SqlitePool,
    user_id: &str,
    offset: FixedOffset,
) -> Result<Vec<i64>, StoreError> {
    let offset_ms = i64::from(offset.local_minus_utc()) * 1000;
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT ("reviewed_at_ms" + ?) / ? AS "day"
        FROM "review_events"
        WHERE "user_id" = ?
        ORDER BY "day" ASC
        "#,
    )
    .bind(offset_ms)
    .bind(DAY_MS)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| row.try_get::<i64, _>("day").map_err(StoreError::from))
        .collect()
}

fn map_state_row(row: &SqliteRow) -> Result<StoredReviewState, StoreError> {
    let card_id: String = row.try_get("card_id")?;
    let due_at_ms: i64 = row.try_get("due_at_ms")?;
    let last_reviewed_at_ms: Option<i64> = row.try_get("last_reviewed_at_ms")?;
    let review_count: i64 = row.try_get("review_count")?;
    let lapse_count: i64 = row.try_get("lapse_count")?;

    let due_at = DateTime::from_timestamp_millis(due_at_ms)
        .ok_or_else(|| StoreError::Corrupt(format!("due_at_ms {due_at_ms} for {card_id}")))?;
    let last_reviewed_at = match last_reviewed_at_ms {
        Some(ms) => Some(
            DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| StoreError::Corrupt(format!("last_reviewed_at_ms {ms} for {card_id}")))?,
        ),
        None => None,
    };

    Ok(StoredReviewState {
        state: ReviewState {
            stability: row.try_get("stability")?,
            difficulty: row.try_get("difficulty")?,
            due_at,
            last_reviewed_at,
            review_count: u32::try_from(review_count).unwrap_or(0),
            lapse_count: u32::try_from(lapse_count).unwrap_or(0),
        },
        version: row.try_get("version")?,
        card_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::{Duration, TimeZone};

    async fn db() -> Database {
        Database::connect("sqlite::memory:", 1).await.unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap()
    }

    fn state(reviewed: DateTime<Utc>, review_count: u32) -> ReviewState {
        ReviewState {
            stability: 3.0,
            difficulty: 5.0,
            due_at: reviewed + Duration::days(3),
            last_reviewed_at: Some(reviewed),
            review_count,
            lapse_count: 0,
        }
    }

    fn event<'a>(card_id: &'a str, reviewed_at: DateTime<Utc>, was_new: bool) -> ReviewEventInput<'a> {
        ReviewEventInput {
            user_id: "u1",
            card_id,
            rating: 3,
            reviewed_at,
            was_new,
        }
    }

    #[tokio::test]
    async fn test_commit_then_load() {
        let db = db().await;
        let pool = db.pool();
        assert!(load_review_state(pool, "u1", "c1").await.unwrap().is_none());

        let first = state(at(10), 1);
        let version = commit_review(pool, None, &first, &event("c1", at(10), true))
            .await
            .unwrap();
        assert_eq!(version, 1);

        let loaded = load_review_state(pool, "u1", "c1").await.unwrap().unwrap();
        assert_eq!(loaded.state, first);
        assert_eq!(loaded.version, 1);
        assert!(load_review_state(pool, "u2", "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_version_conflicts_roll_back() {
        let db = db().await;
        let pool = db.pool();
        commit_review(pool, None, &state(at(10), 1), &event("c1", at(10), true))
            .await
            .unwrap();

        // A second first-review insert loses.
        let err = commit_review(pool, None, &state(at(11), 1), &event("c1", at(11), true))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        let version = commit_review(pool, Some(1), &state(at(12), 2), &event("c1", at(12), false))
            .await
            .unwrap();
        assert_eq!(version, 2);

        // Stale version loses.
        let err = commit_review(pool, Some(1), &state(at(13), 3), &event("c1", at(13), false))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        let counts = count_reviews(pool, "u1", at(0), at(23)).await.unwrap();
        assert_eq!(counts.total, 2, "failed commits must not leave events behind");
    }

    #[tokio::test]
    async fn test_counts_and_days() {
        let db = db().await;
        let pool = db.pool();
        let day1 = at(15);
        let day2 = at(15) + Duration::days(1);

        commit_review(pool, None, &state(day1, 1), &event("a", day1, true)).await.unwrap();
        commit_review(pool, None, &state(day2, 1), &event("b", day2, true)).await.unwrap();
        commit_review(pool, Some(1), &state(day2, 2), &event("a", day2, false))
            .await
            .unwrap();

        let counts = count_reviews(pool, "u1", day2 - Duration::hours(1), day2 + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(
            counts,
            ReviewCounts {
                total: 3,
                in_range: 2,
                new_in_range: 1
            }
        );

        let utc = FixedOffset::east_opt(0).unwrap();
        let days = review_days(pool, "u1", utc).await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[1] - days[0], 1);

        let states = list_review_states(pool, "u1").await.unwrap();
        assert_eq!(states.len(), 2);
    }
}
