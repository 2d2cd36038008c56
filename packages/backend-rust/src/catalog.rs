//! Static catalog of levels and cards.
//!
//! Loaded once at startup and shared read-only. Card order is the stable
//! catalog sequence used to introduce new cards.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Letter,
    Syllable,
    Word,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub content: String,
    pub content_type: ContentType,
    pub level_id: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: u32,
    pub name: String,
    pub description: String,
    /// Percentage of mastered cards needed to unlock the next level
    pub mastery_threshold: f64,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid catalog json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog has no levels")]
    NoLevels,
    #[error("duplicate level id {0}")]
    DuplicateLevel(u32),
    #[error("duplicate card id {0:?}")]
    DuplicateCard(String),
    #[error("card with empty id")]
    EmptyCardId,
    #[error("card {card_id:?} references unknown level {level_id}")]
    UnknownLevel { card_id: String, level_id: u32 },
    #[error("level {level_id} has mastery threshold {value} outside [0, 100]")]
    InvalidThreshold { level_id: u32, value: f64 },
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    levels: Vec<Level>,
    cards: Vec<Card>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    levels: Vec<Level>,
    cards: Vec<Card>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(mut levels: Vec<Level>, cards: Vec<Card>) -> Result<Self, CatalogError> {
        if levels.is_empty() {
            return Err(CatalogError::NoLevels);
        }

        let mut level_ids = HashSet::new();
        for level in &levels {
            if !level_ids.insert(level.id) {
                return Err(CatalogError::DuplicateLevel(level.id));
            }
            if !(0.0..=100.0).contains(&level.mastery_threshold) {
                return Err(CatalogError::InvalidThreshold {
                    level_id: level.id,
                    value: level.mastery_threshold,
                });
            }
        }
        levels.sort_by_key(|level| level.id);

        let mut index = HashMap::with_capacity(cards.len());
        for (position, card) in cards.iter().enumerate() {
            if card.id.trim().is_empty() {
                return Err(CatalogError::EmptyCardId);
            }
            if !level_ids.contains(&card.level_id) {
                return Err(CatalogError::UnknownLevel {
                    card_id: card.id.clone(),
                    level_id: card.level_id,
                });
            }
            if index.insert(card.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateCard(card.id.clone()));
            }
        }

        Ok(Self {
            levels,
            cards,
            index,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Self::new(file.levels, file.cards)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Built-in catalog of the ten reading levels
    pub fn builtin() -> Result<Self, CatalogError> {
        let (levels, cards) = crate::seed::builtin_catalog();
        Self::new(levels, cards)
    }

    /// Levels in ascending id order
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Cards in catalog sequence
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.index.get(card_id).map(|&position| &self.cards[position])
    }

    /// Position of a card in the catalog sequence
    pub fn position(&self, card_id: &str) -> Option<usize> {
        self.index.get(card_id).copied()
    }

    pub fn level(&self, level_id: u32) -> Option<&Level> {
        self.levels.iter().find(|level| level.id == level_id)
    }

    pub fn cards_in_level(&self, level_id: u32) -> impl Iterator<Item = &Card> {
        self.cards.iter().filter(move |card| card.level_id == level_id)
    }
}
