//! Common Types and Constants
//!
//! Shared data structures used by the memory model and its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ==================== Constants ====================

/// Milliseconds in one day; intervals are expressed in fractional days
pub const DAY_MS: f64 = 86_400_000.0;

/// Target probability of recall at the moment a card becomes due
pub const DEFAULT_TARGET_RETRIEVABILITY: f64 = 0.9;

/// Published FSRS-5 default weights (w0..w18)
pub const FSRS5_DEFAULT_WEIGHTS: [f64; 19] = [
    0.40255, 1.18385, 3.173, 15.69105, // w0-w3: initial stability per rating
    7.1949, 0.5345, // w4-w5: initial difficulty
    1.4604, 0.0046, // w6-w7: difficulty step, mean reversion
    1.54575, 0.1192, 1.01925, // w8-w10: recall growth
    1.9395, 0.11, 0.29605, 2.2698, // w11-w14: post-lapse stability
    0.2315, 2.9898, // w15-w16: hard penalty, easy bonus
    0.51655, 0.6621, // w17-w18: short-term (unused)
];

/// Power-law forgetting curve exponent used by FSRS-4.5 and FSRS-5
pub const DEFAULT_DECAY: f64 = -0.5;

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Lowest stability a card can fall to (about 15 minutes)
pub const DEFAULT_STABILITY_FLOOR: f64 = 0.01;

/// Highest stability (and therefore interval) in days, roughly 100 years
pub const DEFAULT_STABILITY_CEILING: f64 = 36_500.0;

/// Fraction of the previous stability a lapse may keep at most
pub const DEFAULT_LAPSE_MAX_RETAINED: f64 = 0.9;

// ==================== Rating ====================

/// Learner self-assessment after the card is flipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rating {
    /// "No me la sabía": the card was forgotten
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn from_value(value: u8) -> Result<Self, MemoryError> {
        match value {
            1 => Ok(Self::Again),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Good),
            4 => Ok(Self::Easy),
            other => Err(MemoryError::InvalidRating(other)),
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn is_lapse(self) -> bool {
        self == Self::Again
    }

    fn index(self) -> usize {
        self as usize - 1
    }

    pub(crate) fn pick<T: Copy>(self, table: &[T; 4]) -> T {
        table[self.index()]
    }
}

impl TryFrom<u8> for Rating {
    type Error = MemoryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.value()
    }
}

// ==================== Review state ====================

/// Spaced-repetition memory record for one learner and one card
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    /// Days until retrievability falls to the target; memory half-life proxy
    pub stability: f64,
    /// Intrinsic hardness within the configured difficulty bounds
    pub difficulty: f64,
    pub due_at: DateTime<Utc>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub review_count: u32,
    pub lapse_count: u32,
}

impl ReviewState {
    pub fn is_new(&self) -> bool {
        self.review_count == 0
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    /// Fractional days since the last review, never negative
    pub fn elapsed_days(&self, now: DateTime<Utc>) -> f64 {
        match self.last_reviewed_at {
            Some(last) => ((now - last).num_milliseconds() as f64 / DAY_MS).max(0.0),
            None => 0.0,
        }
    }
}

/// Result of applying one rating to a card
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub state: ReviewState,
    /// Scheduled interval in fractional days
    pub interval_days: f64,
    /// Retrievability at review time; `None` on the first review
    pub retrievability: Option<f64>,
    /// Whether the card had never been reviewed before this rating
    pub was_new: bool,
}

// ==================== Errors ====================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MemoryError {
    #[error("rating must be between 1 and 4, got {0}")]
    InvalidRating(u8),
    #[error("invalid {field}: {value}")]
    InvalidState { field: &'static str, value: f64 },
    #[error("invalid memory parameters: {0}")]
    InvalidParams(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn rating_accepts_only_one_to_four() {
        assert_eq!(Rating::from_value(1), Ok(Rating::Again));
        assert_eq!(Rating::from_value(4), Ok(Rating::Easy));
        assert_eq!(Rating::from_value(0), Err(MemoryError::InvalidRating(0)));
        assert_eq!(Rating::from_value(5), Err(MemoryError::InvalidRating(5)));
    }

    #[test]
    fn rating_deserializes_from_number() {
        let rating: Rating = serde_json::from_str("3").unwrap();
        assert_eq!(rating, Rating::Good);
        assert!(serde_json::from_str::<Rating>("7").is_err());
        assert_eq!(serde_json::to_string(&Rating::Hard).unwrap(), "2");
    }

    #[test]
    fn elapsed_days_is_clamped_for_clock_skew() {
        let now = Utc::now();
        let state = ReviewState {
            stability: 1.0,
            difficulty: 5.0,
            due_at: now,
            last_reviewed_at: Some(now + Duration::hours(2)),
            review_count: 1,
            lapse_count: 0,
        };
        assert_eq!(state.elapsed_days(now), 0.0);

        let later = now + Duration::hours(36);
        assert!((state.elapsed_days(later) - 34.0 / 24.0).abs() < 1e-9);
    }
}
