//! FSRS memory model
//!
//! Pure functions over [`ReviewState`]: retrievability decay, rating-driven
//! stability/difficulty updates and the interval solved from the same decay
//! curve, so that retrievability at `due_at` equals the target.

use chrono::{DateTime, Duration, Utc};

use crate::params::{DecayCurve, MemoryParams};
use crate::sanitize::{check_state, clamp_difficulty, clamp_stability};
use crate::types::{MemoryError, Rating, ReviewOutcome, ReviewState, DAY_MS};

#[derive(Debug, Clone)]
pub struct MemoryModel {
    params: MemoryParams,
}

impl Default for MemoryModel {
    fn default() -> Self {
        Self {
            params: MemoryParams::default(),
        }
    }
}

impl MemoryModel {
    pub fn new(params: MemoryParams) -> Result<Self, MemoryError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &MemoryParams {
        &self.params
    }

    pub fn retrievability(&self, stability: f64, elapsed_days: f64) -> f64 {
        forgetting_curve(&self.params.decay_curve, stability, elapsed_days)
    }

    pub fn retrievability_at(&self, state: &ReviewState, at: DateTime<Utc>) -> f64 {
        self.retrievability(state.stability, state.elapsed_days(at))
    }

    /// Days until retrievability decays to the target
    pub fn interval_days(&self, stability: f64) -> f64 {
        next_interval(
            &self.params.decay_curve,
            stability,
            self.params.target_retrievability,
        )
    }

    /// Same as [`MemoryModel::update`] for a raw 1..4 rating value.
    pub fn update_from_value(
        &self,
        state: Option<&ReviewState>,
        rating: u8,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome, MemoryError> {
        let rating = Rating::from_value(rating)?;
        self.update(state, rating, now)
    }

    /// Applies one rating. `None` (or a state never reviewed) is a first review.
    pub fn update(
        &self,
        state: Option<&ReviewState>,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome, MemoryError> {
        let params = &self.params;
        let previous = state.filter(|s| !s.is_new());

        let (stability, difficulty, retrievability, review_count, lapse_count) = match previous {
            None => (
                clamp_stability(rating.pick(&params.initial_stability_by_rating), params),
                clamp_difficulty(rating.pick(&params.initial_difficulty_by_rating), params),
                None,
                1,
                0,
            ),
            Some(prev) => {
                check_state(prev)?;
                let r = self.retrievability_at(prev, now);
                let difficulty = next_difficulty(params, prev.difficulty, rating);
                let stability = if rating.is_lapse() {
                    next_forget_stability(params, prev.difficulty, prev.stability, r)
                } else {
                    next_recall_stability(params, prev.difficulty, prev.stability, r, rating)
                };
                let lapses = prev.lapse_count + u32::from(rating.is_lapse());
                (stability, difficulty, Some(r), prev.review_count + 1, lapses)
            }
        };

        let interval_days = self.interval_days(stability);
        let interval_ms = (interval_days * DAY_MS).round() as i64;

        let next = ReviewState {
            stability,
            difficulty,
            due_at: now + Duration::milliseconds(interval_ms),
            last_reviewed_at: Some(now),
            review_count,
            lapse_count,
        };
        check_state(&next)?;

        Ok(ReviewOutcome {
            state: next,
            interval_days,
            retrievability,
            was_new: previous.is_none(),
        })
    }
}

pub fn forgetting_curve(curve: &DecayCurve, stability: f64, elapsed_days: f64) -> f64 {
    if stability <= 0.0 {
        return 0.0;
    }
    let elapsed = elapsed_days.max(0.0);
    (1.0 + curve.factor() * elapsed / stability).powf(curve.decay)
}

pub fn next_interval(curve: &DecayCurve, stability: f64, target_retrievability: f64) -> f64 {
    stability / curve.factor() * (target_retrievability.powf(1.0 / curve.decay) - 1.0)
}

fn next_difficulty(params: &MemoryParams, difficulty: f64, rating: Rating) -> f64 {
    let [min, max] = params.difficulty_bounds;
    let delta = -params.difficulty_step * (f64::from(rating.value()) - 3.0);
    // Linear damping: steps shrink as difficulty approaches the maximum.
    let damped = difficulty + delta * (max - difficulty) / (max - min);
    let anchor = params.initial_difficulty_by_rating[3];
    let w = params.difficulty_mean_reversion;
    clamp_difficulty(w * anchor + (1.0 - w) * damped, params)
}

fn next_recall_stability(
    params: &MemoryParams,
    difficulty: f64,
    stability: f64,
    retrievability: f64,
    rating: Rating,
) -> f64 {
    let growth = &params.growth_curve_params;
    let max_difficulty = params.difficulty_bounds[1];
    let rating_factor = match rating {
        Rating::Hard => growth.hard_penalty,
        Rating::Easy => growth.easy_bonus,
        _ => 1.0,
    };

    let increment = growth.scale.exp()
        * (max_difficulty + 1.0 - difficulty)
        * stability.powf(-growth.stability_exponent)
        * ((1.0 - retrievability) * growth.retrievability_gain).exp_m1()
        * rating_factor;

    clamp_stability(stability * (1.0 + increment), params)
}

fn next_forget_stability(
    params: &MemoryParams,
    difficulty: f64,
    stability: f64,
    retrievability: f64,
) -> f64 {
    let lapse = &params.lapse_penalty;
    let relearned = lapse.scale
        * difficulty.powf(-lapse.difficulty_exponent)
        * ((stability + 1.0).powf(lapse.stability_exponent) - 1.0)
        * ((1.0 - retrievability) * lapse.retrievability_gain).exp();

    clamp_stability(relearned.min(stability * lapse.max_retained), params)
}
