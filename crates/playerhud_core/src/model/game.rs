//! Game (course block instance) model and leveling arithmetic.
//!
//! # Responsibility
//! - Define the per-game configuration that drives the XP economy.
//! - Convert raw XP totals into levels and progress figures.
//!
//! # Invariants
//! - `1 <= xp_per_level <= MAX_XP_PER_LEVEL` and `1 <= max_level <= MAX_LEVEL_CAP`.
//! - Level is `1 + floor(xp / xp_per_level)`, capped at `max_level`.
//! - Negative XP is treated as zero by every calculation.

use crate::model::validation::{validate_name, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one game.
pub type GameId = Uuid;
/// Host-platform user id.
pub type UserId = i64;
/// Host-platform course id.
pub type CourseId = i64;

pub const DEFAULT_XP_PER_LEVEL: i64 = 100;
pub const DEFAULT_MAX_LEVEL: i64 = 20;
pub const MAX_LEVEL_CAP: i64 = 1000;
pub const MAX_XP_PER_LEVEL: i64 = 1_000_000;

/// Tunable economy settings stored on the game row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// XP needed to climb one level.
    pub xp_per_level: i64,
    /// Highest reachable level.
    pub max_level: i64,
    /// Whether the leaderboard is exposed for this game.
    pub ranking_enabled: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            xp_per_level: DEFAULT_XP_PER_LEVEL,
            max_level: DEFAULT_MAX_LEVEL,
            ranking_enabled: true,
        }
    }
}

/// Level position of one XP total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: i64,
    /// XP earned since the current level started.
    pub xp_into_level: i64,
    /// XP missing until the next level; `None` once `max_level` is reached.
    pub xp_to_next: Option<i64>,
    pub max_level_reached: bool,
}

impl GameSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_XP_PER_LEVEL).contains(&self.xp_per_level) {
            return Err(ValidationError::InvalidXpPerLevel(self.xp_per_level));
        }
        if !(1..=MAX_LEVEL_CAP).contains(&self.max_level) {
            return Err(ValidationError::InvalidMaxLevel(self.max_level));
        }
        Ok(())
    }

    /// Returns the level reached with `xp` total experience.
    pub fn level_for_xp(&self, xp: i64) -> i64 {
        let raw = 1 + xp.max(0) / self.xp_per_level;
        raw.min(self.max_level)
    }

    /// Returns XP still missing for the next level, or `None` at the cap.
    pub fn xp_to_next_level(&self, xp: i64) -> Option<i64> {
        let level = self.level_for_xp(xp);
        if level >= self.max_level {
            return None;
        }
        Some(level.saturating_mul(self.xp_per_level) - xp.max(0))
    }

    pub fn level_progress(&self, xp: i64) -> LevelProgress {
        let level = self.level_for_xp(xp);
        let level_floor = (level - 1).saturating_mul(self.xp_per_level);
        let xp_to_next = self.xp_to_next_level(xp);
        LevelProgress {
            level,
            xp_into_level: xp.max(0) - level_floor,
            xp_to_next,
            max_level_reached: xp_to_next.is_none(),
        }
    }
}

/// Percentage of the game's total obtainable XP that `xp` represents.
///
/// Floors to a whole percent and never exceeds 100. A game with no
/// obtainable XP reports 0.
pub fn progress_percent(xp: i64, total_possible_xp: i64) -> u32 {
    if total_possible_xp <= 0 {
        return 0;
    }
    let percent = (i128::from(xp.max(0)) * 100) / i128::from(total_possible_xp);
    percent.min(100) as u32
}

/// One gamified course block instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub course_id: CourseId,
    pub name: String,
    pub settings: GameSettings,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Game {
    /// Creates a game with default settings and a generated id.
    ///
    /// Timestamps are assigned by storage on insert.
    pub fn new(course_id: CourseId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            name: name.into(),
            settings: GameSettings::default(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        self.settings.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::{progress_percent, GameSettings, MAX_XP_PER_LEVEL};

    fn settings(xp_per_level: i64, max_level: i64) -> GameSettings {
        GameSettings {
            xp_per_level,
            max_level,
            ranking_enabled: true,
        }
    }

    #[test]
    fn level_is_one_plus_floor_of_xp_over_step() {
        let s = settings(100, 20);
        assert_eq!(s.level_for_xp(0), 1);
        assert_eq!(s.level_for_xp(99), 1);
        assert_eq!(s.level_for_xp(100), 2);
        assert_eq!(s.level_for_xp(250), 3);
    }

    #[test]
    fn level_is_capped_at_max_level() {
        let s = settings(100, 5);
        assert_eq!(s.level_for_xp(400), 5);
        assert_eq!(s.level_for_xp(10_000), 5);
        assert_eq!(s.xp_to_next_level(10_000), None);
    }

    #[test]
    fn negative_xp_counts_as_zero() {
        let s = settings(50, 10);
        assert_eq!(s.level_for_xp(-30), 1);
        assert_eq!(s.xp_to_next_level(-30), Some(50));
    }

    #[test]
    fn level_progress_reports_position_inside_level() {
        let progress = settings(100, 20).level_progress(250);
        assert_eq!(progress.level, 3);
        assert_eq!(progress.xp_into_level, 50);
        assert_eq!(progress.xp_to_next, Some(50));
        assert!(!progress.max_level_reached);

        let capped = settings(100, 3).level_progress(900);
        assert_eq!(capped.level, 3);
        assert!(capped.max_level_reached);
        assert_eq!(capped.xp_to_next, None);
    }

    #[test]
    fn progress_percent_floors_and_caps() {
        assert_eq!(progress_percent(0, 300), 0);
        assert_eq!(progress_percent(100, 300), 33);
        assert_eq!(progress_percent(300, 300), 100);
        assert_eq!(progress_percent(450, 300), 100);
        assert_eq!(progress_percent(50, 0), 0);
    }

    #[test]
    fn settings_validation_rejects_out_of_range_values() {
        assert!(settings(0, 10).validate().is_err());
        assert!(settings(100, 0).validate().is_err());
        assert!(settings(100, 1001).validate().is_err());
        assert!(settings(MAX_XP_PER_LEVEL + 1, 10).validate().is_err());
        assert!(settings(i64::MAX, 10).validate().is_err());
        assert!(settings(MAX_XP_PER_LEVEL, 1000).validate().is_ok());
        assert!(GameSettings::default().validate().is_ok());
    }

    #[test]
    fn oversized_steps_do_not_overflow() {
        let s = settings(i64::MAX, 3);
        assert_eq!(s.level_for_xp(i64::MAX), 2);
        assert_eq!(s.xp_to_next_level(0), Some(i64::MAX));
        assert_eq!(s.level_progress(i64::MAX).xp_into_level, 0);
    }
}
