//! Mastery and level gating.
//!
//! A card is mastered once its stability passes a threshold and it has been
//! reviewed enough times. Levels unlock in order: the first level is always
//! open, and each next level opens when the previous one is open and its
//! mastered percentage reaches the previous level's threshold.

use std::collections::HashMap;

use repitis_algo::ReviewState;

use crate::catalog::Catalog;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteryPolicy {
    /// Stability must be strictly greater than this many days
    pub min_stability_days: f64,
    pub min_reviews: u32,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self {
            min_stability_days: 7.0,
            min_reviews: 2,
        }
    }
}

impl MasteryPolicy {
    pub fn is_mastered(&self, state: &ReviewState) -> bool {
        state.stability > self.min_stability_days && state.review_count >= self.min_reviews
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelStatus {
    pub level_id: u32,
    pub total_cards: u32,
    pub mastered_cards: u32,
    pub progress_percentage: f64,
    pub is_unlocked: bool,
}

/// Progress and unlock status of every level, in level order.
///
/// `states` maps card id to the learner's review state; cards not in the map
/// are new. A level without cards reports 0 % and does not block the next one.
pub fn level_statuses(
    catalog: &Catalog,
    states: &HashMap<String, ReviewState>,
    policy: &MasteryPolicy,
) -> Vec<LevelStatus> {
    let mut statuses = Vec::with_capacity(catalog.levels().len());
    let mut previous_open = true;

    for level in catalog.levels() {
        let mut total_cards = 0u32;
        let mut mastered_cards = 0u32;
        for card in catalog.cards_in_level(level.id) {
            total_cards += 1;
            if states.get(&card.id).is_some_and(|state| policy.is_mastered(state)) {
                mastered_cards += 1;
            }
        }

        let progress_percentage = if total_cards == 0 {
            0.0
        } else {
            f64::from(mastered_cards) * 100.0 / f64::from(total_cards)
        };

        let is_unlocked = previous_open;
        previous_open =
            is_unlocked && (total_cards == 0 || progress_percentage >= level.mastery_threshold);

        statuses.push(LevelStatus {
            level_id: level.id,
            total_cards,
            mastered_cards,
            progress_percentage,
            is_unlocked,
        });
    }

    statuses
}

/// Highest unlocked level id
pub fn current_level(statuses: &[LevelStatus]) -> u32 {
    statuses
        .iter()
        .filter(|status| status.is_unlocked)
        .map(|status| status.level_id)
        .max()
        .unwrap_or(1)
}
