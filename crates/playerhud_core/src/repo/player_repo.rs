//! Player repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Own player preference flags and view timestamps.
//! - Provide read models for inventory, ranking and progress totals.
//!
//! # Invariants
//! - No method here changes `players.xp`.
//! - Inventory listing is ordered by ledger id, oldest first.
//! - Ranking input only contains enabled players with visible ranking.

use crate::model::game::{GameId, UserId};
use crate::model::inventory::InventoryEntry;
use crate::model::player::Player;
use crate::model::quest::ActivityId;
use crate::model::ranking::RankEntry;
use crate::repo::ledger::{
    ensure_player_row, load_player, parse_inventory_row, INVENTORY_SELECT_SQL,
};
use crate::repo::sql::{bool_to_int, ensure_migrated, to_u32};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection};

/// Repository interface for player rows and player-scoped read models.
pub trait PlayerRepository {
    fn get_player(&self, game_id: GameId, user_id: UserId) -> RepoResult<Option<Player>>;
    /// Gets the player, creating a zero-XP row on first contact.
    fn ensure_player(&self, game_id: GameId, user_id: UserId, now_ms: i64) -> RepoResult<Player>;
    fn set_enabled(&self, game_id: GameId, user_id: UserId, enabled: bool) -> RepoResult<()>;
    fn set_ranking_visible(&self, game_id: GameId, user_id: UserId, visible: bool)
        -> RepoResult<()>;
    fn mark_inventory_viewed(&self, game_id: GameId, user_id: UserId, now_ms: i64)
        -> RepoResult<()>;
    fn mark_quests_viewed(&self, game_id: GameId, user_id: UserId, now_ms: i64) -> RepoResult<()>;
    fn list_inventory(&self, game_id: GameId, user_id: UserId) -> RepoResult<Vec<InventoryEntry>>;
    /// Inventory rows newer than the last inventory view (all rows if never viewed).
    fn count_new_items(&self, game_id: GameId, user_id: UserId) -> RepoResult<u32>;
    /// Enabled quests newer than the last quest view (all if never viewed).
    fn count_new_quests(&self, game_id: GameId, user_id: UserId) -> RepoResult<u32>;
    /// Ranking input for enabled, visible players of one game.
    fn rank_entries(&self, game_id: GameId) -> RepoResult<Vec<RankEntry>>;
    /// Upper bound of XP a single player can earn in one game.
    fn total_possible_xp(&self, game_id: GameId) -> RepoResult<i64>;
    /// Records a host activity completion. Returns `false` if already known.
    fn record_activity_completion(
        &self,
        game_id: GameId,
        user_id: UserId,
        activity_id: ActivityId,
        now_ms: i64,
    ) -> RepoResult<bool>;
}

/// SQLite-backed player repository.
pub struct SqlitePlayerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePlayerRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_migrated(conn)?;
        Ok(Self { conn })
    }

    fn update_player_column(
        &self,
        game_id: GameId,
        user_id: UserId,
        column: &'static str,
        value: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("UPDATE players SET {column} = ?3 WHERE game_uuid = ?1 AND user_id = ?2;"),
            params![game_id.to_string(), user_id, value],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("player", format!("{game_id}/{user_id}")));
        }
        Ok(())
    }

    fn ensure_game_exists(&self, game_id: GameId) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM games WHERE uuid = ?1);",
            [game_id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 1 {
            Ok(())
        } else {
            Err(RepoError::not_found("game", game_id))
        }
    }
}

impl PlayerRepository for SqlitePlayerRepository<'_> {
    fn get_player(&self, game_id: GameId, user_id: UserId) -> RepoResult<Option<Player>> {
        load_player(self.conn, game_id, user_id)
    }

    fn ensure_player(&self, game_id: GameId, user_id: UserId, now_ms: i64) -> RepoResult<Player> {
        self.ensure_game_exists(game_id)?;
        ensure_player_row(self.conn, game_id, user_id, now_ms)
    }

    fn set_enabled(&self, game_id: GameId, user_id: UserId, enabled: bool) -> RepoResult<()> {
        self.update_player_column(game_id, user_id, "is_enabled", bool_to_int(enabled))
    }

    fn set_ranking_visible(
        &self,
        game_id: GameId,
        user_id: UserId,
        visible: bool,
    ) -> RepoResult<()> {
        self.update_player_column(game_id, user_id, "ranking_visible", bool_to_int(visible))
    }

    fn mark_inventory_viewed(
        &self,
        game_id: GameId,
        user_id: UserId,
        now_ms: i64,
    ) -> RepoResult<()> {
        self.update_player_column(game_id, user_id, "last_inventory_view", now_ms)
    }

    fn mark_quests_viewed(&self, game_id: GameId, user_id: UserId, now_ms: i64) -> RepoResult<()> {
        self.update_player_column(game_id, user_id, "last_quest_view", now_ms)
    }

    fn list_inventory(&self, game_id: GameId, user_id: UserId) -> RepoResult<Vec<InventoryEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{INVENTORY_SELECT_SQL}
             WHERE game_uuid = ?1
               AND user_id = ?2
             ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query(params![game_id.to_string(), user_id])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_inventory_row(row)?);
        }
        Ok(entries)
    }

    fn count_new_items(&self, game_id: GameId, user_id: UserId) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM inventory inv
             LEFT JOIN players p
               ON p.game_uuid = inv.game_uuid AND p.user_id = inv.user_id
             WHERE inv.game_uuid = ?1
               AND inv.user_id = ?2
               AND (p.last_inventory_view IS NULL OR inv.created_at > p.last_inventory_view);",
            params![game_id.to_string(), user_id],
            |row| row.get(0),
        )?;
        to_u32(count, "inventory count")
    }

    fn count_new_quests(&self, game_id: GameId, user_id: UserId) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*)
             FROM quests q
             WHERE q.game_uuid = ?1
               AND q.is_enabled = 1
               AND q.created_at > COALESCE(
                    (SELECT last_quest_view FROM players WHERE game_uuid = ?1 AND user_id = ?2),
                    -1
               );",
            params![game_id.to_string(), user_id],
            |row| row.get(0),
        )?;
        to_u32(count, "quest count")
    }

    fn rank_entries(&self, game_id: GameId) -> RepoResult<Vec<RankEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, xp, xp_updated_at
             FROM players
             WHERE game_uuid = ?1
               AND is_enabled = 1
               AND ranking_visible = 1
             ORDER BY xp DESC, xp_updated_at ASC, user_id ASC;",
        )?;
        let mut rows = stmt.query([game_id.to_string()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(RankEntry {
                user_id: row.get(0)?,
                xp: row.get(1)?,
                xp_updated_at: row.get(2)?,
            });
        }
        Ok(entries)
    }

    fn total_possible_xp(&self, game_id: GameId) -> RepoResult<i64> {
        let total = self.conn.query_row(
            "SELECT
                COALESCE((
                    SELECT SUM(i.xp * d.max_usage)
                    FROM drops d
                    INNER JOIN items i ON i.uuid = d.item_uuid
                    WHERE d.game_uuid = ?1
                      AND d.max_usage > 0
                      AND i.is_enabled = 1
                ), 0)
              + COALESCE((
                    SELECT SUM(q.reward_xp + COALESCE(ri.xp, 0))
                    FROM quests q
                    LEFT JOIN items ri ON ri.uuid = q.reward_item_uuid
                    WHERE q.game_uuid = ?1
                      AND q.is_enabled = 1
                ), 0);",
            [game_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    fn record_activity_completion(
        &self,
        game_id: GameId,
        user_id: UserId,
        activity_id: ActivityId,
        now_ms: i64,
    ) -> RepoResult<bool> {
        self.ensure_game_exists(game_id)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO activity_completions (
                game_uuid,
                user_id,
                activity_id,
                completed_at
            ) VALUES (?1, ?2, ?3, ?4);",
            params![game_id.to_string(), user_id, activity_id, now_ms],
        )?;
        Ok(inserted == 1)
    }
}
