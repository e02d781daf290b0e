//! Drop repository contracts and SQLite implementation.
//!
//! # Invariants
//! - A drop's item belongs to the same game as the drop.
//! - Codes are unique per game; collisions surface as `DuplicateDropCode`.
//! - Codes are stored normalized (uppercase).

use crate::model::drop::{DropId, ItemDrop};
use crate::model::game::GameId;
use crate::model::item::ItemId;
use crate::repo::sql::{ensure_migrated, parse_uuid, to_u32};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const DROP_SELECT_SQL: &str = "SELECT
    uuid,
    game_uuid,
    item_uuid,
    name,
    code,
    max_usage,
    cooldown_secs
FROM drops";

/// Repository interface for drop locations.
pub trait DropRepository {
    fn create_drop(&self, drop: &ItemDrop) -> RepoResult<DropId>;
    /// Replaces name, code and limits. Item and game are fixed.
    fn update_drop(&self, drop: &ItemDrop) -> RepoResult<()>;
    fn get_drop(&self, id: DropId) -> RepoResult<Option<ItemDrop>>;
    /// Resolves a normalized code inside one game.
    fn get_drop_by_code(&self, game_id: GameId, code: &str) -> RepoResult<Option<ItemDrop>>;
    fn list_drops(&self, game_id: GameId) -> RepoResult<Vec<ItemDrop>>;
    fn list_drops_for_item(&self, item_id: ItemId) -> RepoResult<Vec<ItemDrop>>;
}

/// SQLite-backed drop repository.
pub struct SqliteDropRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDropRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_migrated(conn)?;
        Ok(Self { conn })
    }

    fn ensure_item_in_game(&self, drop: &ItemDrop) -> RepoResult<()> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM items WHERE uuid = ?1 AND game_uuid = ?2
            );",
            params![drop.item_id.to_string(), drop.game_id.to_string()],
            |row| row.get(0),
        )?;
        if exists == 1 {
            Ok(())
        } else {
            Err(RepoError::not_found("item", drop.item_id))
        }
    }

    fn ensure_code_free(&self, drop: &ItemDrop) -> RepoResult<()> {
        let taken: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM drops WHERE game_uuid = ?1 AND code = ?2 AND uuid <> ?3
            );",
            params![
                drop.game_id.to_string(),
                drop.code.as_str(),
                drop.id.to_string()
            ],
            |row| row.get(0),
        )?;
        if taken == 1 {
            Err(RepoError::DuplicateDropCode(drop.code.clone()))
        } else {
            Ok(())
        }
    }
}

impl DropRepository for SqliteDropRepository<'_> {
    fn create_drop(&self, drop: &ItemDrop) -> RepoResult<DropId> {
        drop.validate()?;
        self.ensure_item_in_game(drop)?;
        self.ensure_code_free(drop)?;

        self.conn.execute(
            "INSERT INTO drops (
                uuid,
                game_uuid,
                item_uuid,
                name,
                code,
                max_usage,
                cooldown_secs
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                drop.id.to_string(),
                drop.game_id.to_string(),
                drop.item_id.to_string(),
                drop.name.trim(),
                drop.code.as_str(),
                drop.max_usage,
                drop.cooldown_secs,
            ],
        )?;

        Ok(drop.id)
    }

    fn update_drop(&self, drop: &ItemDrop) -> RepoResult<()> {
        drop.validate()?;
        self.ensure_code_free(drop)?;

        let changed = self.conn.execute(
            "UPDATE drops
             SET
                name = ?3,
                code = ?4,
                max_usage = ?5,
                cooldown_secs = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND game_uuid = ?2;",
            params![
                drop.id.to_string(),
                drop.game_id.to_string(),
                drop.name.trim(),
                drop.code.as_str(),
                drop.max_usage,
                drop.cooldown_secs,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("drop", drop.id));
        }
        Ok(())
    }

    fn get_drop(&self, id: DropId) -> RepoResult<Option<ItemDrop>> {
        load_drop(self.conn, id)
    }

    fn get_drop_by_code(&self, game_id: GameId, code: &str) -> RepoResult<Option<ItemDrop>> {
        load_drop_by_code(self.conn, game_id, code)
    }

    fn list_drops(&self, game_id: GameId) -> RepoResult<Vec<ItemDrop>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DROP_SELECT_SQL}
             WHERE game_uuid = ?1
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([game_id.to_string()])?;
        let mut drops = Vec::new();
        while let Some(row) = rows.next()? {
            drops.push(parse_drop_row(row)?);
        }
        Ok(drops)
    }

    fn list_drops_for_item(&self, item_id: ItemId) -> RepoResult<Vec<ItemDrop>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DROP_SELECT_SQL}
             WHERE item_uuid = ?1
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([item_id.to_string()])?;
        let mut drops = Vec::new();
        while let Some(row) = rows.next()? {
            drops.push(parse_drop_row(row)?);
        }
        Ok(drops)
    }
}

pub(crate) fn load_drop(conn: &Connection, id: DropId) -> RepoResult<Option<ItemDrop>> {
    let mut stmt = conn.prepare(&format!("{DROP_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_drop_row(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn load_drop_by_code(
    conn: &Connection,
    game_id: GameId,
    code: &str,
) -> RepoResult<Option<ItemDrop>> {
    let mut stmt = conn.prepare(&format!(
        "{DROP_SELECT_SQL} WHERE game_uuid = ?1 AND code = ?2;"
    ))?;
    let mut rows = stmt.query(params![game_id.to_string(), code])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_drop_row(row)?)),
        None => Ok(None),
    }
}

fn parse_drop_row(row: &Row<'_>) -> RepoResult<ItemDrop> {
    let uuid_text: String = row.get("uuid")?;
    let game_text: String = row.get("game_uuid")?;
    let item_text: String = row.get("item_uuid")?;
    Ok(ItemDrop {
        id: parse_uuid(&uuid_text, "drops.uuid")?,
        game_id: parse_uuid(&game_text, "drops.game_uuid")?,
        item_id: parse_uuid(&item_text, "drops.item_uuid")?,
        name: row.get("name")?,
        code: row.get("code")?,
        max_usage: to_u32(row.get("max_usage")?, "drops.max_usage")?,
        cooldown_secs: to_u32(row.get("cooldown_secs")?, "drops.cooldown_secs")?,
    })
}
