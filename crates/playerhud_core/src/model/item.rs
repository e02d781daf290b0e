//! Collectible item model.
//!
//! # Invariants
//! - `xp >= 0`.
//! - Secret items stay out of a player's catalogue until owned.
//! - Disabled items cannot be collected from drops.

use crate::model::game::GameId;
use crate::model::validation::{validate_name, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ItemId = Uuid;

const MAX_EMOJI_CHARS: usize = 16;

static IMAGE_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[^\s]+\.(png|jpe?g|gif|svg|webp)$").expect("valid image file regex")
});

/// Visual shown for an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ItemImage {
    None,
    Emoji(String),
    /// Path or URL of an uploaded image file.
    File(String),
}

impl ItemImage {
    /// Classifies raw admin input into an image value.
    ///
    /// Image paths become `File`; other short text is taken as an emoji.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::None);
        }
        if IMAGE_FILE_RE.is_match(trimmed) {
            return Ok(Self::File(trimmed.to_string()));
        }
        if trimmed.contains(['/', '\\']) || trimmed.chars().count() > MAX_EMOJI_CHARS {
            return Err(ValidationError::InvalidImage(trimmed.to_string()));
        }
        Ok(Self::Emoji(trimmed.to_string()))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Item definition owned by one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub game_id: GameId,
    pub name: String,
    pub description: String,
    pub image: ItemImage,
    /// XP credited when the item is collected from a finite drop.
    pub xp: i64,
    pub is_enabled: bool,
    pub is_secret: bool,
    /// Stored for catalogue display; no trade flow consumes it.
    pub is_tradable: bool,
}

impl Item {
    /// Creates an enabled, public item with a generated id.
    pub fn new(game_id: GameId, name: impl Into<String>, xp: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            name: name.into(),
            description: String::new(),
            image: ItemImage::None,
            xp,
            is_enabled: true,
            is_secret: false,
            is_tradable: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        if self.xp < 0 {
            return Err(ValidationError::NegativeXp(self.xp));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Item, ItemImage};
    use crate::model::validation::ValidationError;
    use uuid::Uuid;

    #[test]
    fn image_parse_distinguishes_files_and_emoji() {
        assert_eq!(ItemImage::parse("  ").unwrap(), ItemImage::None);
        assert_eq!(
            ItemImage::parse("pix/key.PNG").unwrap(),
            ItemImage::File("pix/key.PNG".to_string())
        );
        assert_eq!(
            ItemImage::parse("🗝️").unwrap(),
            ItemImage::Emoji("🗝️".to_string())
        );
    }

    #[test]
    fn image_parse_rejects_non_image_paths_and_long_text() {
        assert!(matches!(
            ItemImage::parse("docs/readme.txt"),
            Err(ValidationError::InvalidImage(_))
        ));
        assert!(ItemImage::parse("this is far too long for an emoji").is_err());
    }

    #[test]
    fn negative_xp_fails_validation() {
        let item = Item::new(Uuid::new_v4(), "Cursed coin", -5);
        assert_eq!(item.validate(), Err(ValidationError::NegativeXp(-5)));
    }
}
