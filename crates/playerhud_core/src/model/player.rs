//! Player record: one user's state inside one game.

use crate::model::game::{GameId, LevelProgress, UserId};
use serde::{Deserialize, Serialize};

/// Per (game, user) progression row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub game_id: GameId,
    pub user_id: UserId,
    /// Running XP total. Only changed by collection, grant and quest claims.
    pub xp: i64,
    /// Opt-in flag. Opted-out players cannot collect or claim.
    pub is_enabled: bool,
    /// Whether the player appears on the public leaderboard.
    pub ranking_visible: bool,
    pub last_inventory_view: Option<i64>,
    pub last_quest_view: Option<i64>,
    /// Last time `xp` changed; breaks ties on the leaderboard.
    pub xp_updated_at: i64,
    pub created_at: i64,
}

impl Player {
    /// Fresh player row with zero XP, opted in and visible.
    pub fn new(game_id: GameId, user_id: UserId, now_ms: i64) -> Self {
        Self {
            game_id,
            user_id,
            xp: 0,
            is_enabled: true,
            ranking_visible: true,
            last_inventory_view: None,
            last_quest_view: None,
            xp_updated_at: now_ms,
            created_at: now_ms,
        }
    }
}

/// Read model shown in a player's HUD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player: Player,
    pub level: LevelProgress,
    /// Share of the game's obtainable XP, 0..=100.
    pub progress_percent: u32,
    /// `None` when the game hides ranking or the player opted out.
    pub rank: Option<u32>,
    pub total_possible_xp: i64,
    /// Inventory rows added since the inventory was last viewed.
    pub new_items: u32,
    /// Enabled quests created since the quest list was last viewed.
    pub new_quests: u32,
}
