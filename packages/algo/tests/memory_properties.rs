//! Property-Based Tests for the memory model
//!
//! Tests the following invariants:
//! - Spacing: repeated non-lapse ratings reviewed on time give strictly growing intervals
//! - Lapse: rating 1 shrinks stability and schedules sooner than rating 3 would
//! - Round-trip: retrievability at `due_at` equals the target retrievability
//! - Bounds: difficulty stays within its bounds, stability above the floor

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use repitis_algo::{MemoryModel, MemoryParams, Rating, ReviewState};

fn arb_rating() -> impl Strategy<Value = Rating> {
    prop_oneof![
        Just(Rating::Again),
        Just(Rating::Hard),
        Just(Rating::Good),
        Just(Rating::Easy),
    ]
}

fn arb_success_rating() -> impl Strategy<Value = Rating> {
    prop_oneof![Just(Rating::Hard), Just(Rating::Good), Just(Rating::Easy)]
}

fn arb_start() -> impl Strategy<Value = DateTime<Utc>> {
    (1_600_000_000i64..1_900_000_000i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

/// Replays a rating history, each review at the due time plus a delay
fn replay(
    model: &MemoryModel,
    start: DateTime<Utc>,
    history: &[(Rating, u32)],
) -> Option<ReviewState> {
    let mut state: Option<ReviewState> = None;
    let mut now = start;
    for (rating, delay_hours) in history {
        let outcome = model.update(state.as_ref(), *rating, now).unwrap();
        now = outcome.state.due_at + Duration::hours(i64::from(*delay_hours));
        state = Some(outcome.state);
    }
    state
}

proptest! {
    #[test]
    fn prop_spacing_grows_without_lapses(
        start in arb_start(),
        ratings in prop::collection::vec(arb_success_rating(), 2..8),
    ) {
        let model = MemoryModel::default();
        let ceiling = model.params().stability_ceiling;
        let mut outcome = model.update(None, ratings[0], start).unwrap();
        for rating in &ratings[1..] {
            let next = model.update(Some(&outcome.state), *rating, outcome.state.due_at).unwrap();
            if next.state.stability >= ceiling {
                break;
            }
            prop_assert!(next.interval_days > outcome.interval_days);
            outcome = next;
        }
    }

    #[test]
    fn prop_lapse_is_shorter_than_good(
        start in arb_start(),
        history in prop::collection::vec((arb_rating(), 0u32..200), 1..6),
        delay_hours in 0u32..2000,
    ) {
        let model = MemoryModel::default();
        let state = replay(&model, start, &history).unwrap();
        let at = state.due_at + Duration::hours(i64::from(delay_hours));

        let lapse = model.update(Some(&state), Rating::Again, at).unwrap();
        let good = model.update(Some(&state), Rating::Good, at).unwrap();

        if state.stability > model.params().stability_floor {
            prop_assert!(lapse.state.stability < state.stability);
        }
        prop_assert!(lapse.interval_days < good.interval_days);
        prop_assert_eq!(lapse.state.lapse_count, state.lapse_count + 1);
    }

    #[test]
    fn prop_round_trip_at_due(
        start in arb_start(),
        history in prop::collection::vec((arb_rating(), 0u32..500), 1..10),
        target in 0.7f64..0.97,
    ) {
        let params = MemoryParams::default().with_target_retrievability(target);
        let model = MemoryModel::new(params).unwrap();
        let state = replay(&model, start, &history).unwrap();
        let r = model.retrievability_at(&state, state.due_at);
        prop_assert!((r - target).abs() < 1e-3, "r = {}, target = {}", r, target);
    }

    #[test]
    fn prop_state_stays_in_bounds(
        start in arb_start(),
        history in prop::collection::vec((arb_rating(), 0u32..5000), 1..20),
    ) {
        let model = MemoryModel::default();
        let params = model.params();
        let state = replay(&model, start, &history).unwrap();
        prop_assert!(state.difficulty >= params.difficulty_bounds[0]);
        prop_assert!(state.difficulty <= params.difficulty_bounds[1]);
        prop_assert!(state.stability >= params.stability_floor);
        prop_assert!(state.stability <= params.stability_ceiling);
        prop_assert_eq!(state.review_count as usize, history.len());
    }
}
