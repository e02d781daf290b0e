//! Quest definitions, claim log and goal evaluation.
//!
//! # Invariants
//! - Goal targets are positive.
//! - A quest rewards XP, an item, or both.
//! - Each (quest, user) pair is claimed at most once.

use crate::model::game::{GameId, UserId};
use crate::model::item::ItemId;
use crate::model::validation::{validate_name, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub type QuestId = Uuid;
/// Host-platform activity (course module) id.
pub type ActivityId = i64;

/// Condition a player must meet before claiming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestGoal {
    ReachLevel { level: i64 },
    ReachXp { xp: i64 },
    /// Total inventory rows, any item.
    CollectItems { count: u32 },
    CollectItem { item_id: ItemId, count: u32 },
    CompleteActivity { activity_id: ActivityId },
}

impl QuestGoal {
    /// Storage tag for `quests.goal_type`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ReachLevel { .. } => "reach_level",
            Self::ReachXp { .. } => "reach_xp",
            Self::CollectItems { .. } => "collect_items",
            Self::CollectItem { .. } => "collect_item",
            Self::CompleteActivity { .. } => "complete_activity",
        }
    }

    /// Numeric target stored in `quests.goal_value`.
    pub fn target_value(&self) -> i64 {
        match *self {
            Self::ReachLevel { level } => level,
            Self::ReachXp { xp } => xp,
            Self::CollectItems { count } => i64::from(count),
            Self::CollectItem { count, .. } => i64::from(count),
            Self::CompleteActivity { activity_id } => activity_id,
        }
    }

    pub fn item_id(&self) -> Option<ItemId> {
        match *self {
            Self::CollectItem { item_id, .. } => Some(item_id),
            _ => None,
        }
    }

    /// Rebuilds a goal from its storage columns.
    pub fn from_parts(type_name: &str, value: i64, item_id: Option<ItemId>) -> Option<Self> {
        let count = u32::try_from(value).ok();
        match type_name {
            "reach_level" => Some(Self::ReachLevel { level: value }),
            "reach_xp" => Some(Self::ReachXp { xp: value }),
            "collect_items" => count.map(|count| Self::CollectItems { count }),
            "collect_item" => match (item_id, count) {
                (Some(item_id), Some(count)) => Some(Self::CollectItem { item_id, count }),
                _ => None,
            },
            "complete_activity" => Some(Self::CompleteActivity { activity_id: value }),
            _ => None,
        }
    }

    /// Measures `snapshot` against this goal.
    pub fn evaluate(&self, snapshot: &PlayerSnapshot) -> QuestProgress {
        let (current, target) = match *self {
            Self::ReachLevel { level } => (snapshot.level, level),
            Self::ReachXp { xp } => (snapshot.xp, xp),
            Self::CollectItems { count } => (i64::from(snapshot.items_total), i64::from(count)),
            Self::CollectItem { item_id, count } => (
                i64::from(snapshot.item_counts.get(&item_id).copied().unwrap_or(0)),
                i64::from(count),
            ),
            Self::CompleteActivity { activity_id } => (
                i64::from(snapshot.completed_activities.contains(&activity_id)),
                1,
            ),
        };
        QuestProgress {
            current: current.min(target),
            target,
            complete: current >= target,
        }
    }
}

/// Quest definition owned by one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    pub game_id: GameId,
    pub name: String,
    pub description: String,
    pub goal: QuestGoal,
    pub reward_xp: i64,
    pub reward_item_id: Option<ItemId>,
    pub is_enabled: bool,
    pub created_at: i64,
}

impl Quest {
    /// Creates an enabled quest with an XP reward and a generated id.
    pub fn new(game_id: GameId, name: impl Into<String>, goal: QuestGoal, reward_xp: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            name: name.into(),
            description: String::new(),
            goal,
            reward_xp,
            reward_item_id: None,
            is_enabled: true,
            created_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        if self.reward_xp < 0 {
            return Err(ValidationError::NegativeXp(self.reward_xp));
        }
        if self.reward_xp == 0 && self.reward_item_id.is_none() {
            return Err(ValidationError::MissingReward);
        }
        let target = self.goal.target_value();
        if target <= 0 {
            return Err(ValidationError::InvalidGoalTarget(target));
        }
        Ok(())
    }
}

/// Everything goal evaluation needs to know about one player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub xp: i64,
    pub level: i64,
    pub items_total: u32,
    pub item_counts: HashMap<ItemId, u32>,
    pub completed_activities: HashSet<ActivityId>,
}

/// Goal progress, with `current` clamped to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub current: i64,
    pub target: i64,
    pub complete: bool,
}

/// Claim log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestClaim {
    pub id: i64,
    pub quest_id: QuestId,
    pub game_id: GameId,
    pub user_id: UserId,
    /// Total XP credited by this claim, reward item XP included.
    pub reward_xp: i64,
    pub reward_item_id: Option<ItemId>,
    pub claimed_at: i64,
}

/// Quest as seen by one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestStatus {
    pub quest: Quest,
    pub progress: QuestProgress,
    pub claimed: bool,
}

impl QuestStatus {
    pub fn is_claimable(&self) -> bool {
        self.progress.complete && !self.claimed
    }
}
