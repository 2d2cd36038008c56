//! Data Sanitization
//!
//! Numerical guards for memory states.
//!
//! Functions:
//! - Non-finite value detection
//! - Difficulty / stability clamping
//! - Post-update state checks

use crate::params::MemoryParams;
use crate::types::{MemoryError, ReviewState};

/// Returns true when any value is NaN or infinite
pub fn has_invalid_values(values: &[f64]) -> bool {
    values.iter().any(|&x| x.is_nan() || x.is_infinite())
}

pub fn clamp_difficulty(difficulty: f64, params: &MemoryParams) -> f64 {
    let [min, max] = params.difficulty_bounds;
    difficulty.clamp(min, max)
}

pub fn clamp_stability(stability: f64, params: &MemoryParams) -> f64 {
    stability.clamp(params.stability_floor, params.stability_ceiling)
}

/// Rejects states that no correct update can produce.
///
/// Stability must be finite and strictly positive, difficulty finite and
/// non-negative. Clamping happens before this check, so a failure means the
/// parameters themselves produced garbage.
pub fn check_state(state: &ReviewState) -> Result<(), MemoryError> {
    if !state.stability.is_finite() || state.stability <= 0.0 {
        return Err(MemoryError::InvalidState {
            field: "stability",
            value: state.stability,
        });
    }
    if !state.difficulty.is_finite() || state.difficulty < 0.0 {
        return Err(MemoryError::InvalidState {
            field: "difficulty",
            value: state.difficulty,
        });
    }
    Ok(())
}
