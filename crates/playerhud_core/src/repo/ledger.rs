//! Row-level building blocks for XP-affecting transactions.
//!
//! Every function takes a plain `&Connection` so it can run on a
//! `Transaction` through deref. Callers own the transaction boundary; no
//! function here commits.

use crate::model::drop::{DropId, DropUsage};
use crate::model::game::{GameId, GameSettings, UserId};
use crate::model::inventory::{InventoryEntry, InventorySource};
use crate::model::item::ItemId;
use crate::model::player::Player;
use crate::model::quest::PlayerSnapshot;
use crate::repo::sql::{int_to_bool, parse_optional_uuid, parse_uuid, to_u32};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

pub(crate) const PLAYER_SELECT_SQL: &str = "SELECT
    game_uuid,
    user_id,
    xp,
    is_enabled,
    ranking_visible,
    last_inventory_view,
    last_quest_view,
    xp_updated_at,
    created_at
FROM players";

pub(crate) const INVENTORY_SELECT_SQL: &str = "SELECT
    id,
    game_uuid,
    user_id,
    item_uuid,
    drop_uuid,
    source,
    xp_awarded,
    created_at
FROM inventory";

/// Inventory row about to be appended.
pub(crate) struct NewInventoryEntry {
    pub game_id: GameId,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub drop_id: Option<DropId>,
    pub source: InventorySource,
    pub xp_awarded: i64,
    pub created_at: i64,
}

pub(crate) fn load_player(
    conn: &Connection,
    game_id: GameId,
    user_id: UserId,
) -> RepoResult<Option<Player>> {
    let mut stmt = conn.prepare(&format!(
        "{PLAYER_SELECT_SQL} WHERE game_uuid = ?1 AND user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![game_id.to_string(), user_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_player_row(row)?)),
        None => Ok(None),
    }
}

/// Returns the player row, inserting a fresh one on first contact.
pub(crate) fn ensure_player_row(
    conn: &Connection,
    game_id: GameId,
    user_id: UserId,
    now_ms: i64,
) -> RepoResult<Player> {
    conn.execute(
        "INSERT OR IGNORE INTO players (
            game_uuid,
            user_id,
            xp,
            is_enabled,
            ranking_visible,
            xp_updated_at,
            created_at
        ) VALUES (?1, ?2, 0, 1, 1, ?3, ?3);",
        params![game_id.to_string(), user_id, now_ms],
    )?;
    load_player(conn, game_id, user_id)?.ok_or_else(|| {
        RepoError::InvalidData(format!(
            "player ({game_id}, {user_id}) missing after insert"
        ))
    })
}

pub(crate) fn append_inventory(
    conn: &Connection,
    entry: &NewInventoryEntry,
) -> RepoResult<InventoryEntry> {
    conn.execute(
        "INSERT INTO inventory (
            game_uuid,
            user_id,
            item_uuid,
            drop_uuid,
            source,
            xp_awarded,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            entry.game_id.to_string(),
            entry.user_id,
            entry.item_id.to_string(),
            entry.drop_id.map(|id| id.to_string()),
            entry.source.as_str(),
            entry.xp_awarded,
            entry.created_at,
        ],
    )?;

    Ok(InventoryEntry {
        id: conn.last_insert_rowid(),
        game_id: entry.game_id,
        user_id: entry.user_id,
        item_id: entry.item_id,
        drop_id: entry.drop_id,
        source: entry.source,
        xp_awarded: entry.xp_awarded,
        created_at: entry.created_at,
    })
}

/// Adds `amount` XP and stamps `xp_updated_at`. Zero is a no-op.
///
/// Returns the new XP total.
pub(crate) fn credit_xp(
    conn: &Connection,
    game_id: GameId,
    user_id: UserId,
    amount: i64,
    now_ms: i64,
) -> RepoResult<i64> {
    if amount > 0 {
        let changed = conn.execute(
            "UPDATE players
             SET xp = xp + ?3,
                 xp_updated_at = ?4
             WHERE game_uuid = ?1
               AND user_id = ?2;",
            params![game_id.to_string(), user_id, amount, now_ms],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("player", format!("{game_id}/{user_id}")));
        }
    }

    let xp = conn.query_row(
        "SELECT xp FROM players WHERE game_uuid = ?1 AND user_id = ?2;",
        params![game_id.to_string(), user_id],
        |row| row.get(0),
    )?;
    Ok(xp)
}

pub(crate) fn drop_usage(
    conn: &Connection,
    drop_id: DropId,
    user_id: UserId,
) -> RepoResult<DropUsage> {
    let (count, last): (i64, Option<i64>) = conn.query_row(
        "SELECT COUNT(*), MAX(created_at)
         FROM inventory
         WHERE drop_uuid = ?1
           AND user_id = ?2;",
        params![drop_id.to_string(), user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(DropUsage {
        times_collected: to_u32(count, "inventory count")?,
        last_collected_at: last,
    })
}

/// Collects what quest goals need to know about one player.
pub(crate) fn player_snapshot(
    conn: &Connection,
    settings: &GameSettings,
    player: &Player,
) -> RepoResult<PlayerSnapshot> {
    let mut snapshot = PlayerSnapshot {
        xp: player.xp,
        level: settings.level_for_xp(player.xp),
        ..PlayerSnapshot::default()
    };

    let mut stmt = conn.prepare(
        "SELECT item_uuid, COUNT(*)
         FROM inventory
         WHERE game_uuid = ?1
           AND user_id = ?2
         GROUP BY item_uuid;",
    )?;
    let mut rows = stmt.query(params![player.game_id.to_string(), player.user_id])?;
    while let Some(row) = rows.next()? {
        let item_text: String = row.get(0)?;
        let count = to_u32(row.get(1)?, "inventory count")?;
        snapshot.items_total += count;
        snapshot
            .item_counts
            .insert(parse_uuid(&item_text, "inventory.item_uuid")?, count);
    }

    let mut stmt = conn.prepare(
        "SELECT activity_id
         FROM activity_completions
         WHERE game_uuid = ?1
           AND user_id = ?2;",
    )?;
    let mut rows = stmt.query(params![player.game_id.to_string(), player.user_id])?;
    while let Some(row) = rows.next()? {
        snapshot.completed_activities.insert(row.get(0)?);
    }

    Ok(snapshot)
}

pub(crate) fn parse_player_row(row: &Row<'_>) -> RepoResult<Player> {
    let game_text: String = row.get("game_uuid")?;
    Ok(Player {
        game_id: parse_uuid(&game_text, "players.game_uuid")?,
        user_id: row.get("user_id")?,
        xp: row.get("xp")?,
        is_enabled: int_to_bool(row.get("is_enabled")?, "players.is_enabled")?,
        ranking_visible: int_to_bool(row.get("ranking_visible")?, "players.ranking_visible")?,
        last_inventory_view: row.get("last_inventory_view")?,
        last_quest_view: row.get("last_quest_view")?,
        xp_updated_at: row.get("xp_updated_at")?,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn parse_inventory_row(row: &Row<'_>) -> RepoResult<InventoryEntry> {
    let game_text: String = row.get("game_uuid")?;
    let item_text: String = row.get("item_uuid")?;
    let source_text: String = row.get("source")?;
    let source = InventorySource::parse(&source_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid source `{source_text}` in inventory.source"))
    })?;

    Ok(InventoryEntry {
        id: row.get("id")?,
        game_id: parse_uuid(&game_text, "inventory.game_uuid")?,
        user_id: row.get("user_id")?,
        item_id: parse_uuid(&item_text, "inventory.item_uuid")?,
        drop_id: parse_optional_uuid(row.get("drop_uuid")?, "inventory.drop_uuid")?,
        source,
        xp_awarded: row.get("xp_awarded")?,
        created_at: row.get("created_at")?,
    })
}
