//! Drop location model and availability gating.
//!
//! # Responsibility
//! - Describe where an item can be picked up and how often.
//! - Decide whether one more collection is allowed for a player.
//!
//! # Invariants
//! - `max_usage == 0` means unlimited pickups, and such drops never grant XP.
//! - Codes are 4-16 uppercase alphanumerics, unique inside a game.
//! - Usage limit is checked before cooldown.

use crate::model::game::GameId;
use crate::model::item::ItemId;
use crate::model::validation::{validate_name, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type DropId = Uuid;

pub const GENERATED_CODE_LEN: usize = 8;

static DROP_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{4,16}$").expect("valid drop code regex"));

/// A named place that yields one item when its code is redeemed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub id: DropId,
    pub game_id: GameId,
    pub item_id: ItemId,
    pub name: String,
    pub code: String,
    /// Pickups allowed per player; `0` is unlimited.
    pub max_usage: u32,
    /// Seconds a player waits between pickups from this drop.
    pub cooldown_secs: u32,
}

/// Prior pickups of one drop by one player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropUsage {
    pub times_collected: u32,
    pub last_collected_at: Option<i64>,
}

/// Why a drop cannot be collected right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRejection {
    LimitReached { max_usage: u32 },
    CooldownActive { remaining_secs: u64 },
}

impl Display for DropRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LimitReached { max_usage } => {
                write!(f, "drop limit of {max_usage} pickups reached")
            }
            Self::CooldownActive { remaining_secs } => {
                write!(f, "drop is cooling down for {remaining_secs}s")
            }
        }
    }
}

impl Error for DropRejection {}

impl ItemDrop {
    /// Creates a single-use drop with a generated code.
    pub fn new(game_id: GameId, item_id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            item_id,
            name: name.into(),
            code: generate_drop_code(),
            max_usage: 1,
            cooldown_secs: 0,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_usage == 0
    }

    /// Unlimited drops never pay out XP so they cannot be farmed.
    pub fn grants_xp(&self) -> bool {
        !self.is_unlimited()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        validate_drop_code(&self.code)
    }

    /// Checks usage limit, then cooldown, for one more pickup at `now_ms`.
    pub fn check_availability(&self, usage: DropUsage, now_ms: i64) -> Result<(), DropRejection> {
        if !self.is_unlimited() && usage.times_collected >= self.max_usage {
            return Err(DropRejection::LimitReached {
                max_usage: self.max_usage,
            });
        }

        if self.cooldown_secs > 0 {
            if let Some(last) = usage.last_collected_at {
                let ready_at = last + i64::from(self.cooldown_secs) * 1000;
                if now_ms < ready_at {
                    let remaining_ms = (ready_at - now_ms) as u64;
                    return Err(DropRejection::CooldownActive {
                        remaining_secs: remaining_ms.div_ceil(1000),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Trims and uppercases a code typed by a player.
pub fn normalize_drop_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

pub fn validate_drop_code(code: &str) -> Result<(), ValidationError> {
    if DROP_CODE_RE.is_match(code) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDropCode(code.to_string()))
    }
}

/// Generates a fresh 8-character code from a random UUID.
pub fn generate_drop_code() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(GENERATED_CODE_LEN)
        .collect::<String>()
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::{
        generate_drop_code, normalize_drop_code, validate_drop_code, ItemDrop, DropRejection,
        DropUsage,
    };
    use uuid::Uuid;

    fn drop_with(max_usage: u32, cooldown_secs: u32) -> ItemDrop {
        let mut drop = ItemDrop::new(Uuid::new_v4(), Uuid::new_v4(), "Library desk");
        drop.max_usage = max_usage;
        drop.cooldown_secs = cooldown_secs;
        drop
    }

    fn used(times: u32, last: i64) -> DropUsage {
        DropUsage {
            times_collected: times,
            last_collected_at: Some(last),
        }
    }

    #[test]
    fn first_pickup_is_always_available() {
        let drop = drop_with(1, 60);
        assert_eq!(drop.check_availability(DropUsage::default(), 0), Ok(()));
    }

    #[test]
    fn limit_is_enforced_before_cooldown() {
        let drop = drop_with(2, 60);
        assert_eq!(
            drop.check_availability(used(2, 1_000), 2_000),
            Err(DropRejection::LimitReached { max_usage: 2 })
        );
    }

    #[test]
    fn cooldown_rounds_remaining_seconds_up() {
        let drop = drop_with(5, 60);
        assert_eq!(
            drop.check_availability(used(1, 10_000), 10_500),
            Err(DropRejection::CooldownActive { remaining_secs: 60 })
        );
        assert_eq!(
            drop.check_availability(used(1, 10_000), 69_001),
            Err(DropRejection::CooldownActive { remaining_secs: 1 })
        );
        assert_eq!(drop.check_availability(used(1, 10_000), 70_000), Ok(()));
    }

    #[test]
    fn unlimited_drop_ignores_count_but_not_cooldown() {
        let drop = drop_with(0, 30);
        assert!(!drop.grants_xp());
        assert_eq!(drop.check_availability(used(500, 0), 30_000), Ok(()));
        assert!(matches!(
            drop.check_availability(used(500, 0), 1_000),
            Err(DropRejection::CooldownActive { .. })
        ));
    }

    #[test]
    fn generated_codes_are_valid_and_normalization_uppercases() {
        let code = generate_drop_code();
        assert_eq!(code.len(), 8);
        assert!(validate_drop_code(&code).is_ok());
        assert_eq!(normalize_drop_code("  ab12cd "), "AB12CD");
        assert!(validate_drop_code("ab12").is_err());
        assert!(validate_drop_code("AB1").is_err());
    }
}
