//! Sittings: the short-lived, per-learner cursor between "give me a card" and
//! "here is my rating".
//!
//! A cursor lives in memory only. It tracks the presented card, the cards
//! already shown, and how many new cards this sitting introduced. Calls for
//! one learner are serialized on the cursor's lock; different learners never
//! contend beyond the registry lookup.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use repitis_algo::Rating;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::{Card, Catalog, ContentType};
use crate::services::card_selector::{select, CompletionReason, Selection, SelectionContext};
use crate::services::progress::ProgressAggregator;
use crate::services::scheduler::{Scheduler, SchedulerError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionPolicy {
    pub new_cards_per_sitting: u32,
    pub new_cards_per_day: u32,
    pub idle_timeout: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            new_cards_per_sitting: 10,
            new_cards_per_day: 20,
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SittingState {
    AwaitingCard,
    CardPresented,
    RatingSubmitted,
    SessionComplete,
}

#[derive(Debug, Clone)]
pub struct SessionCursor {
    pub sitting_id: Uuid,
    pub state: SittingState,
    pub presented: Option<String>,
    pub shown: HashSet<String>,
    pub new_introduced: u32,
    pub completion: Option<CompletionReason>,
    pub last_active: DateTime<Utc>,
}

impl SessionCursor {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            sitting_id: Uuid::new_v4(),
            state: SittingState::AwaitingCard,
            presented: None,
            shown: HashSet::new(),
            new_introduced: 0,
            completion: None,
            last_active: now,
        }
    }

    pub fn is_idle(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        now - self.last_active > timeout
    }

    fn present(&mut self, card_id: &str, reset_shown: bool, now: DateTime<Utc>) {
        if reset_shown {
            self.shown.clear();
        }
        self.shown.insert(card_id.to_string());
        self.presented = Some(card_id.to_string());
        self.state = SittingState::CardPresented;
        self.last_active = now;
    }

    fn complete(&mut self, reason: CompletionReason, now: DateTime<Utc>) {
        self.presented = None;
        self.completion = Some(reason);
        self.state = SittingState::SessionComplete;
        self.last_active = now;
    }

    fn rated(&mut self, was_new: bool, now: DateTime<Utc>) {
        self.presented = None;
        if was_new {
            self.new_introduced += 1;
        }
        self.state = SittingState::RatingSubmitted;
        self.last_active = now;
    }
}

type CursorSlot = Arc<tokio::sync::Mutex<SessionCursor>>;

/// In-memory cursors keyed by learner id.
#[derive(Default)]
pub struct SessionRegistry {
    slots: parking_lot::Mutex<HashMap<String, CursorSlot>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, user_id: &str, now: DateTime<Utc>) -> CursorSlot {
        let mut slots = self.slots.lock();
        slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(SessionCursor::new(now))))
            .clone()
    }

    /// Drops idle cursors. Cursors locked by an in-flight request are kept.
    pub fn evict_idle(&self, now: DateTime<Utc>, timeout: Duration) -> usize {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| match slot.try_lock() {
            Ok(cursor) => !cursor.is_idle(now, timeout),
            Err(_) => true,
        });
        before - slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub id: String,
    pub content: String,
    pub content_type: ContentType,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub level_id: u32,
    pub is_new: bool,
}

impl CardView {
    fn new(card: &Card, is_new: bool) -> Self {
        Self {
            id: card.id.clone(),
            content: card.content.clone(),
            content_type: card.content_type,
            image_url: card.image_url.clone(),
            audio_url: card.audio_url.clone(),
            level_id: card.level_id,
            is_new,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextCard {
    pub card: Option<CardView>,
    pub session_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NextCard {
    fn complete(reason: CompletionReason) -> Self {
        Self {
            card: None,
            session_complete: true,
            message: Some(reason.message().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewResult {
    pub success: bool,
    pub next_review: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn encouragement(rating: Rating) -> &'static str {
    match rating {
        Rating::Again => "¡Sigue practicando!",
        Rating::Hard => "¡Bien hecho!",
        Rating::Good => "¡Muy bien!",
        Rating::Easy => "¡Excelente!",
    }
}

/// Orchestrates selection and scheduling around a learner's sitting.
pub struct SessionController {
    catalog: Arc<Catalog>,
    scheduler: Scheduler,
    progress: ProgressAggregator,
    registry: Arc<SessionRegistry>,
    policy: SessionPolicy,
}

impl SessionController {
    pub fn new(
        catalog: Arc<Catalog>,
        scheduler: Scheduler,
        progress: ProgressAggregator,
        registry: Arc<SessionRegistry>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            catalog,
            scheduler,
            progress,
            registry,
            policy,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Picks the card to show now and records it as presented. A completed
    /// sitting keeps answering "complete" until it goes idle.
    pub async fn next_card(&self, user_id: &str, now: DateTime<Utc>) -> Result<NextCard, SchedulerError> {
        let slot = self.registry.slot(user_id, now);
        let mut cursor = slot.lock().await;

        if cursor.is_idle(now, self.policy.idle_timeout) {
            debug!(user_id, sitting_id = %cursor.sitting_id, "Idle sitting reset");
            *cursor = SessionCursor::new(now);
        }

        if let Some(reason) = cursor.completion {
            return Ok(NextCard::complete(reason));
        }

        let snapshot = self.progress.snapshot(user_id, now).await?;
        let new_today = u32::try_from(snapshot.new_cards_today.max(0)).unwrap_or(u32::MAX);

        let selection = select(&SelectionContext {
            catalog: &self.catalog,
            states: &snapshot.states,
            statuses: &snapshot.statuses,
            shown: &cursor.shown,
            presented: cursor.presented.as_deref(),
            sitting_new_remaining: self
                .policy
                .new_cards_per_sitting
                .saturating_sub(cursor.new_introduced),
            day_new_remaining: self.policy.new_cards_per_day.saturating_sub(new_today),
            now,
        });

        match selection {
            Selection::Card {
                card,
                is_new,
                reset_shown,
            } => {
                cursor.present(&card.id, reset_shown, now);
                debug!(user_id, card_id = %card.id, is_new, reset_shown, "Card presented");
                Ok(NextCard {
                    card: Some(CardView::new(card, is_new)),
                    session_complete: false,
                    message: None,
                })
            }
            Selection::Complete(reason) => {
                cursor.complete(reason, now);
                info!(
                    user_id,
                    sitting_id = %cursor.sitting_id,
                    new_introduced = cursor.new_introduced,
                    reason = ?reason,
                    "Sitting complete"
                );
                Ok(NextCard::complete(reason))
            }
        }
    }

    /// Applies a rating to the presented card. Ratings for any other card,
    /// including a repeat for a card already rated, are stale.
    pub async fn review_card(
        &self,
        user_id: &str,
        card_id: &str,
        rating: u8,
        now: DateTime<Utc>,
    ) -> Result<ReviewResult, SchedulerError> {
        let rating = Rating::from_value(rating)?;
        if self.catalog.card(card_id).is_none() {
            return Err(SchedulerError::NotFound(card_id.to_string()));
        }

        let slot = self.registry.slot(user_id, now);
        let mut cursor = slot.lock().await;

        if cursor.is_idle(now, self.policy.idle_timeout) {
            *cursor = SessionCursor::new(now);
        }
        if cursor.presented.as_deref() != Some(card_id) {
            return Err(SchedulerError::StaleReview(card_id.to_string()));
        }

        let receipt = self
            .scheduler
            .record_review(user_id, card_id, rating, now)
            .await?;
        cursor.rated(receipt.was_new, now);

        Ok(ReviewResult {
            success: true,
            next_review: receipt
                .state
                .due_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            message: Some(encouragement(rating).to_string()),
        })
    }
}
