//! Validation errors shared by model records.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum display-name length for games, items, drops and quests.
pub const MAX_NAME_CHARS: usize = 255;

/// Rejection raised by a model `validate()` call before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is empty after trim.
    BlankName,
    /// Name exceeds [`MAX_NAME_CHARS`].
    NameTooLong { max_chars: usize },
    /// XP amounts are never negative.
    NegativeXp(i64),
    /// `xp_per_level` is outside `1..=MAX_XP_PER_LEVEL`.
    InvalidXpPerLevel(i64),
    /// `max_level` is outside the supported range.
    InvalidMaxLevel(i64),
    /// Drop code is not 4-16 uppercase alphanumerics.
    InvalidDropCode(String),
    /// Image value is neither an image path nor a short emoji.
    InvalidImage(String),
    /// Quest goal targets must be positive.
    InvalidGoalTarget(i64),
    /// Quest grants neither XP nor an item.
    MissingReward,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name must not be blank"),
            Self::NameTooLong { max_chars } => {
                write!(f, "name must be at most {max_chars} characters")
            }
            Self::NegativeXp(value) => write!(f, "xp must not be negative, got {value}"),
            Self::InvalidXpPerLevel(value) => {
                write!(f, "xp_per_level out of range, got {value}")
            }
            Self::InvalidMaxLevel(value) => {
                write!(f, "max_level must be within 1..=1000, got {value}")
            }
            Self::InvalidDropCode(code) => write!(
                f,
                "drop code `{code}` must be 4-16 uppercase letters or digits"
            ),
            Self::InvalidImage(value) => write!(f, "unsupported item image `{value}`"),
            Self::InvalidGoalTarget(value) => {
                write!(f, "quest goal target must be positive, got {value}")
            }
            Self::MissingReward => write!(f, "quest must reward xp or an item"),
        }
    }
}

impl Error for ValidationError {}

/// Validates one display name against the shared naming contract.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankName);
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::NameTooLong {
            max_chars: MAX_NAME_CHARS,
        });
    }
    Ok(())
}
