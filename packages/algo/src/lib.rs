//! # repitis-algo - memory model for spaced repetition
//!
//! Pure Rust implementation of the FSRS scheduling equations used by the
//! Repitis backend:
//!
//! - **Retrievability** - power-law forgetting curve over elapsed days
//! - **Stability / difficulty updates** - per-rating FSRS rules with named, tunable constants
//! - **Intervals** - solved from the same curve so recall at `due_at` hits the target
//!
//! No I/O and no async: every function is a pure function of its inputs.
//!
//! ## Modules
//!
//! - [`memory`] - [`MemoryModel`] and the update rules
//! - [`params`] - [`MemoryParams`] and FSRS weight mapping
//! - [`sanitize`] - clamping and post-update state checks
//! - [`types`] - ratings, review state, errors and constants
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use repitis_algo::{MemoryModel, Rating};
//!
//! let model = MemoryModel::default();
//! let now = Utc::now();
//! let first = model.update(None, Rating::Good, now).unwrap();
//! assert!(first.state.due_at > now);
//!
//! let r = model.retrievability_at(&first.state, first.state.due_at);
//! assert!((r - 0.9).abs() < 1e-3);
//! ```

pub mod memory;
pub mod params;
pub mod sanitize;
pub mod types;

pub use memory::MemoryModel;
pub use params::{DecayCurve, GrowthCurve, LapsePenalty, MemoryParams};
pub use types::*;
