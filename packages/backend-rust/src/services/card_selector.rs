//! Next-card selection.
//!
//! Order of preference:
//! 1. the card already presented in this sitting, while it is still eligible
//! 2. due cards in unlocked levels, earliest `due_at` first, ties in catalog order
//! 3. the first un-introduced card (catalog order) of the lowest unlocked level
//!    that has one, while the new-card allowance lasts
//!
//! Cards already shown in the sitting are skipped unless nothing else is left.
//! Selection never uses randomness: the same inputs give the same card.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use repitis_algo::ReviewState;

use crate::catalog::{Card, Catalog};
use crate::services::mastery::LevelStatus;

pub struct SelectionContext<'a, 'b> {
    pub catalog: &'a Catalog,
    /// Review states of the learner keyed by card id
    pub states: &'b HashMap<String, ReviewState>,
    pub statuses: &'b [LevelStatus],
    pub shown: &'b HashSet<String>,
    pub presented: Option<&'b str>,
    pub sitting_new_remaining: u32,
    pub day_new_remaining: u32,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// Nothing due and every unlocked card has been introduced
    Exhausted,
    SittingCapReached,
    DailyCapReached,
}

impl CompletionReason {
    pub fn message(self) -> &'static str {
        match self {
            CompletionReason::Exhausted => {
                "No hay más tarjetas por ahora. ¡Vuelve más tarde para repasar!"
            }
            CompletionReason::SittingCapReached => "¡Sesión completa! Excelente trabajo.",
            CompletionReason::DailyCapReached => {
                "Ya viste todas las tarjetas nuevas de hoy. ¡Vuelve mañana!"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'a> {
    Card {
        card: &'a Card,
        is_new: bool,
        /// Every candidate had been shown already; the caller should forget
        /// the shown set before recording this card.
        reset_shown: bool,
    },
    Complete(CompletionReason),
}

pub fn select<'a>(ctx: &SelectionContext<'a, '_>) -> Selection<'a> {
    if let Some(card) = ctx
        .presented
        .and_then(|id| ctx.catalog.card(id))
        .filter(|card| ctx.is_eligible(card))
    {
        return ctx.card(card, false);
    }

    if let Some(card) = ctx.next_due(true).or_else(|| ctx.next_new(true)) {
        return ctx.card(card, false);
    }

    if let Some(card) = ctx.next_due(false).or_else(|| ctx.next_new(false)) {
        return ctx.card(card, true);
    }

    Selection::Complete(ctx.completion_reason())
}

impl<'a> SelectionContext<'a, '_> {
    fn card(&self, card: &'a Card, reset_shown: bool) -> Selection<'a> {
        Selection::Card {
            card,
            is_new: !self.states.contains_key(&card.id),
            reset_shown,
        }
    }

    fn new_allowance(&self) -> u32 {
        self.sitting_new_remaining.min(self.day_new_remaining)
    }

    fn is_unlocked(&self, level_id: u32) -> bool {
        self.statuses
            .iter()
            .any(|status| status.level_id == level_id && status.is_unlocked)
    }

    fn is_eligible(&self, card: &Card) -> bool {
        if !self.is_unlocked(card.level_id) {
            return false;
        }
        match self.states.get(&card.id) {
            Some(state) => state.is_due(self.now),
            None => self.new_allowance() > 0,
        }
    }

    fn excluded(&self, card: &Card, skip_shown: bool) -> bool {
        skip_shown && self.shown.contains(&card.id)
    }

    fn next_due(&self, skip_shown: bool) -> Option<&'a Card> {
        self.catalog
            .cards()
            .iter()
            .enumerate()
            .filter(|(_, card)| self.is_unlocked(card.level_id) && !self.excluded(card, skip_shown))
            .filter_map(|(position, card)| {
                let state = self.states.get(&card.id)?;
                state.is_due(self.now).then_some((state.due_at, position, card))
            })
            .min_by_key(|(due_at, position, _)| (*due_at, *position))
            .map(|(_, _, card)| card)
    }

    fn next_new(&self, skip_shown: bool) -> Option<&'a Card> {
        if self.new_allowance() == 0 {
            return None;
        }
        let catalog = self.catalog;
        catalog
            .levels()
            .iter()
            .filter(|level| self.is_unlocked(level.id))
            .find_map(|level| {
                catalog.cards_in_level(level.id).find(|card| {
                    !self.states.contains_key(&card.id) && !self.excluded(card, skip_shown)
                })
            })
    }

    fn completion_reason(&self) -> CompletionReason {
        let new_left = self.catalog.cards().iter().any(|card| {
            self.is_unlocked(card.level_id) && !self.states.contains_key(&card.id)
        });
        if !new_left {
            CompletionReason::Exhausted
        } else if self.day_new_remaining == 0 {
            CompletionReason::DailyCapReached
        } else {
            CompletionReason::SittingCapReached
        }
    }
}
