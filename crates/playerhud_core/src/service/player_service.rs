//! Player HUD use-case service.
//!
//! # Responsibility
//! - Build the player summary (level, progress, rank, unseen counts).
//! - Apply player preference toggles and view markers.
//! - Expose the leaderboard when the game enables ranking.
//!
//! # Invariants
//! - Rank is `None` when the game disables ranking or the player opted out.
//! - A player hidden from the leaderboard still sees their own rank,
//!   computed against the visible field.

use crate::model::game::{progress_percent, GameId, GameSettings, UserId};
use crate::model::inventory::InventoryEntry;
use crate::model::player::{Player, PlayerSummary};
use crate::model::quest::ActivityId;
use crate::model::ranking::{rank_entries, rank_of, RankEntry};
use crate::repo::game_repo::GameRepository;
use crate::repo::player_repo::PlayerRepository;
use crate::repo::RepoResult;
use crate::service::ServiceError;
use log::info;
use serde::{Deserialize, Serialize};

/// One leaderboard row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub xp: i64,
    pub level: i64,
}

/// Player service facade over player and game repositories.
pub struct PlayerService<P: PlayerRepository, G: GameRepository> {
    players: P,
    games: G,
}

impl<P: PlayerRepository, G: GameRepository> PlayerService<P, G> {
    pub fn new(players: P, games: G) -> Self {
        Self { players, games }
    }

    /// Builds the HUD summary, creating the player row on first contact.
    pub fn summary(
        &self,
        game_id: GameId,
        user_id: UserId,
        now_ms: i64,
    ) -> Result<PlayerSummary, ServiceError> {
        let settings = self.settings(game_id)?;
        let player = self.players.ensure_player(game_id, user_id, now_ms)?;
        let total_possible_xp = self.players.total_possible_xp(game_id)?;
        let rank = self.own_rank(&settings, &player)?;

        Ok(PlayerSummary {
            level: settings.level_progress(player.xp),
            progress_percent: progress_percent(player.xp, total_possible_xp),
            rank,
            total_possible_xp,
            new_items: self.players.count_new_items(game_id, user_id)?,
            new_quests: self.players.count_new_quests(game_id, user_id)?,
            player,
        })
    }

    /// Opts a player in or out of the game.
    pub fn set_enabled(
        &self,
        game_id: GameId,
        user_id: UserId,
        enabled: bool,
        now_ms: i64,
    ) -> Result<Player, ServiceError> {
        self.players.ensure_player(game_id, user_id, now_ms)?;
        self.players.set_enabled(game_id, user_id, enabled)?;
        info!("event=player_toggle module=service status=ok game={game_id} user={user_id} enabled={enabled}");
        self.read_back(game_id, user_id)
    }

    /// Shows or hides a player on the leaderboard.
    pub fn set_ranking_visible(
        &self,
        game_id: GameId,
        user_id: UserId,
        visible: bool,
        now_ms: i64,
    ) -> Result<Player, ServiceError> {
        self.players.ensure_player(game_id, user_id, now_ms)?;
        self.players.set_ranking_visible(game_id, user_id, visible)?;
        info!(
            "event=player_ranking_visibility module=service status=ok game={game_id} user={user_id} visible={visible}"
        );
        self.read_back(game_id, user_id)
    }

    /// Clears the unseen-items counter.
    pub fn mark_inventory_viewed(
        &self,
        game_id: GameId,
        user_id: UserId,
        now_ms: i64,
    ) -> Result<(), ServiceError> {
        self.players.ensure_player(game_id, user_id, now_ms)?;
        self.players.mark_inventory_viewed(game_id, user_id, now_ms)?;
        Ok(())
    }

    /// Clears the unseen-quests counter.
    pub fn mark_quests_viewed(
        &self,
        game_id: GameId,
        user_id: UserId,
        now_ms: i64,
    ) -> Result<(), ServiceError> {
        self.players.ensure_player(game_id, user_id, now_ms)?;
        self.players.mark_quests_viewed(game_id, user_id, now_ms)?;
        Ok(())
    }

    pub fn inventory(&self, game_id: GameId, user_id: UserId) -> RepoResult<Vec<InventoryEntry>> {
        self.players.list_inventory(game_id, user_id)
    }

    /// Records that the host marked an activity complete for this user.
    ///
    /// Returns `false` when the completion was already known.
    pub fn record_activity_completion(
        &self,
        game_id: GameId,
        user_id: UserId,
        activity_id: ActivityId,
        now_ms: i64,
    ) -> Result<bool, ServiceError> {
        let recorded = self
            .players
            .record_activity_completion(game_id, user_id, activity_id, now_ms)?;
        if recorded {
            info!(
                "event=activity_complete module=service status=ok game={game_id} user={user_id} activity={activity_id}"
            );
        }
        Ok(recorded)
    }

    /// Ranked enabled and visible players of one game.
    pub fn leaderboard(&self, game_id: GameId) -> Result<Vec<LeaderboardEntry>, ServiceError> {
        let settings = self.settings(game_id)?;
        if !settings.ranking_enabled {
            return Err(ServiceError::RankingDisabled(game_id));
        }

        Ok(rank_entries(self.players.rank_entries(game_id)?)
            .into_iter()
            .map(|row| LeaderboardEntry {
                rank: row.rank,
                user_id: row.entry.user_id,
                xp: row.entry.xp,
                level: settings.level_for_xp(row.entry.xp),
            })
            .collect())
    }

    fn own_rank(&self, settings: &GameSettings, player: &Player) -> RepoResult<Option<u32>> {
        if !settings.ranking_enabled || !player.is_enabled {
            return Ok(None);
        }
        let field = self.players.rank_entries(player.game_id)?;
        let me = RankEntry {
            user_id: player.user_id,
            xp: player.xp,
            xp_updated_at: player.xp_updated_at,
        };
        Ok(Some(rank_of(&me, &field)))
    }

    fn settings(&self, game_id: GameId) -> Result<GameSettings, ServiceError> {
        self.games
            .get_game(game_id)?
            .map(|game| game.settings)
            .ok_or_else(|| ServiceError::not_found("game", game_id))
    }

    fn read_back(&self, game_id: GameId, user_id: UserId) -> Result<Player, ServiceError> {
        self.players
            .get_player(game_id, user_id)?
            .ok_or(ServiceError::InconsistentState("player missing after update"))
    }
}
