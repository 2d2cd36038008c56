//! Tunable memory-model constants
//!
//! Every number the model uses lives here, grouped by the update rule it
//! feeds. [`MemoryParams::from_weights`] maps a published FSRS weight vector
//! onto the named groups so reference vectors can be dropped in unchanged.

use serde::{Deserialize, Serialize};

use crate::sanitize::has_invalid_values;
use crate::types::{
    MemoryError, DEFAULT_DECAY, DEFAULT_LAPSE_MAX_RETAINED, DEFAULT_STABILITY_CEILING,
    DEFAULT_STABILITY_FLOOR, DEFAULT_TARGET_RETRIEVABILITY, FSRS5_DEFAULT_WEIGHTS,
    MAX_DIFFICULTY, MIN_DIFFICULTY,
};

/// Stability growth after a successful recall (ratings 2-4)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthCurve {
    /// e^scale multiplies the whole increment (w8)
    pub scale: f64,
    /// Larger stabilities grow proportionally less: S^-exponent (w9)
    pub stability_exponent: f64,
    /// Low retrievability at review time boosts growth: e^(gain*(1-R)) - 1 (w10)
    pub retrievability_gain: f64,
    /// Multiplier applied to the increment for "hard" (w15, < 1)
    pub hard_penalty: f64,
    /// Multiplier applied to the increment for "easy" (w16, > 1)
    pub easy_bonus: f64,
}

/// Post-lapse stability (rating 1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapsePenalty {
    pub scale: f64,
    pub difficulty_exponent: f64,
    pub stability_exponent: f64,
    pub retrievability_gain: f64,
    /// A lapse keeps at most this fraction of the previous stability
    pub max_retained: f64,
}

/// Power-law forgetting curve R(t, S) = (1 + factor * t / S)^decay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayCurve {
    pub decay: f64,
}

impl DecayCurve {
    /// Chosen so that R(S, S) = 0.9, i.e. stability is the 90 % interval
    pub fn factor(&self) -> f64 {
        0.9f64.powf(1.0 / self.decay) - 1.0
    }
}

impl Default for DecayCurve {
    fn default() -> Self {
        Self {
            decay: DEFAULT_DECAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryParams {
    /// Stability in days after the first rating, indexed by rating 1..4
    pub initial_stability_by_rating: [f64; 4],
    /// Difficulty after the first rating, indexed by rating 1..4
    pub initial_difficulty_by_rating: [f64; 4],
    /// Difficulty change per rating step away from "good" (w6)
    pub difficulty_step: f64,
    /// Pull towards the "easy" initial difficulty on every review (w7)
    pub difficulty_mean_reversion: f64,
    pub growth_curve_params: GrowthCurve,
    pub lapse_penalty: LapsePenalty,
    /// Inclusive [min, max]
    pub difficulty_bounds: [f64; 2],
    pub stability_floor: f64,
    pub stability_ceiling: f64,
    pub decay_curve: DecayCurve,
    pub target_retrievability: f64,
}

impl Default for MemoryParams {
    fn default() -> Self {
        // The published defaults always map cleanly.
        Self::from_fsrs5(&FSRS5_DEFAULT_WEIGHTS)
    }
}

impl MemoryParams {
    /// Builds parameters from an FSRS-4.5 (17) or FSRS-5 (19) weight vector.
    ///
    /// The FSRS-5 short-term weights (w17, w18) are accepted but unused: same-day
    /// reviews go through the regular recall/lapse rules.
    pub fn from_weights(weights: &[f64]) -> Result<Self, MemoryError> {
        if weights.len() != 17 && weights.len() != 19 {
            return Err(MemoryError::InvalidParams(format!(
                "expected 17 or 19 weights, got {}",
                weights.len()
            )));
        }
        if has_invalid_values(weights) {
            return Err(MemoryError::InvalidParams(
                "weights must be finite".to_string(),
            ));
        }

        let mut padded = FSRS5_DEFAULT_WEIGHTS;
        padded[..weights.len()].copy_from_slice(weights);
        let params = Self::from_fsrs5(&padded);
        params.validate()?;
        Ok(params)
    }

    fn from_fsrs5(w: &[f64; 19]) -> Self {
        let bounds = [MIN_DIFFICULTY, MAX_DIFFICULTY];
        let initial_difficulty = |grade: f64| {
            (w[4] - (w[5] * (grade - 1.0)).exp() + 1.0).clamp(bounds[0], bounds[1])
        };

        Self {
            initial_stability_by_rating: [w[0], w[1], w[2], w[3]],
            initial_difficulty_by_rating: [
                initial_difficulty(1.0),
                initial_difficulty(2.0),
                initial_difficulty(3.0),
                initial_difficulty(4.0),
            ],
            difficulty_step: w[6],
            difficulty_mean_reversion: w[7],
            growth_curve_params: GrowthCurve {
                scale: w[8],
                stability_exponent: w[9],
                retrievability_gain: w[10],
                hard_penalty: w[15],
                easy_bonus: w[16],
            },
            lapse_penalty: LapsePenalty {
                scale: w[11],
                difficulty_exponent: w[12],
                stability_exponent: w[13],
                retrievability_gain: w[14],
                max_retained: DEFAULT_LAPSE_MAX_RETAINED,
            },
            difficulty_bounds: bounds,
            stability_floor: DEFAULT_STABILITY_FLOOR,
            stability_ceiling: DEFAULT_STABILITY_CEILING,
            decay_curve: DecayCurve::default(),
            target_retrievability: DEFAULT_TARGET_RETRIEVABILITY,
        }
    }

    pub fn with_target_retrievability(mut self, target: f64) -> Self {
        self.target_retrievability = target;
        self
    }

    pub fn validate(&self) -> Result<(), MemoryError> {
        let [min_d, max_d] = self.difficulty_bounds;
        if !(min_d.is_finite() && max_d.is_finite() && min_d > 0.0 && min_d < max_d) {
            return Err(MemoryError::InvalidParams(format!(
                "difficulty bounds [{min_d}, {max_d}] must satisfy 0 < min < max"
            )));
        }
        if !(self.stability_floor > 0.0 && self.stability_floor < self.stability_ceiling) {
            return Err(MemoryError::InvalidParams(format!(
                "stability floor {} must be positive and below the ceiling {}",
                self.stability_floor, self.stability_ceiling
            )));
        }
        if !(self.target_retrievability > 0.0 && self.target_retrievability < 1.0) {
            return Err(MemoryError::InvalidParams(format!(
                "target retrievability {} must lie in (0, 1)",
                self.target_retrievability
            )));
        }
        if !(self.decay_curve.decay < 0.0 && self.decay_curve.decay.is_finite()) {
            return Err(MemoryError::InvalidParams(format!(
                "decay {} must be negative",
                self.decay_curve.decay
            )));
        }
        if self.initial_stability_by_rating.iter().any(|s| !(*s > 0.0)) {
            return Err(MemoryError::InvalidParams(
                "initial stabilities must be positive".to_string(),
            ));
        }
        if self
            .initial_difficulty_by_rating
            .iter()
            .any(|d| !(min_d..=max_d).contains(d))
        {
            return Err(MemoryError::InvalidParams(
                "initial difficulties must lie within the difficulty bounds".to_string(),
            ));
        }
        let growth = &self.growth_curve_params;
        if !(growth.hard_penalty > 0.0 && growth.easy_bonus > 0.0 && growth.retrievability_gain > 0.0)
        {
            return Err(MemoryError::InvalidParams(
                "growth curve multipliers must be positive".to_string(),
            ));
        }
        let lapse = &self.lapse_penalty;
        if !(lapse.max_retained > 0.0 && lapse.max_retained < 1.0 && lapse.scale > 0.0) {
            return Err(MemoryError::InvalidParams(format!(
                "lapse penalty must keep a fraction in (0, 1), got {}",
                lapse.max_retained
            )));
        }
        if !(0.0..=1.0).contains(&self.difficulty_mean_reversion) {
            return Err(MemoryError::InvalidParams(format!(
                "mean reversion {} must lie in [0, 1]",
                self.difficulty_mean_reversion
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(MemoryParams::default().validate().is_ok());
    }

    #[test]
    fn initial_values_are_ordered_by_rating() {
        let params = MemoryParams::default();
        let s = params.initial_stability_by_rating;
        let d = params.initial_difficulty_by_rating;
        assert!(s[0] < s[1] && s[1] < s[2] && s[2] < s[3]);
        assert!(d[0] > d[1] && d[1] > d[2] && d[2] > d[3]);
    }

    #[test]
    fn decay_factor_matches_fsrs_constant() {
        let curve = DecayCurve::default();
        assert!((curve.factor() - 19.0 / 81.0).abs() < 1e-12);
    }

    #[test]
    fn from_weights_rejects_wrong_length_and_nan() {
        assert!(MemoryParams::from_weights(&[1.0; 5]).is_err());
        let mut weights = FSRS5_DEFAULT_WEIGHTS;
        weights[3] = f64::NAN;
        assert!(MemoryParams::from_weights(&weights).is_err());
        weights[3] = f64::INFINITY;
        assert!(matches!(
            MemoryParams::from_weights(&weights),
            Err(MemoryError::InvalidParams(_))
        ));
    }

    #[test]
    fn from_weights_accepts_fsrs45_vector() {
        let fsrs45 = [
            0.4872, 1.4003, 3.7145, 13.8206, 5.1618, 1.2298, 0.8975, 0.031, 1.6474, 0.1367,
            1.0461, 2.1072, 0.0793, 0.3246, 1.587, 0.2272, 2.8755,
        ];
        let params = MemoryParams::from_weights(&fsrs45).unwrap();
        assert_eq!(params.initial_stability_by_rating[3], 13.8206);
        assert_eq!(params.growth_curve_params.easy_bonus, 2.8755);
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let mut params = MemoryParams::default();
        params.difficulty_bounds = [10.0, 1.0];
        assert!(params.validate().is_err());

        let params = MemoryParams::default().with_target_retrievability(1.0);
        assert!(params.validate().is_err());
    }
}
