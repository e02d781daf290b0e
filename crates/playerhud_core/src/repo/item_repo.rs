//! Item repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Items are disabled, never deleted; inventory rows keep pointing at them.
//! - Player catalogue hides disabled items and unowned secret items.
//! - Listing order is deterministic: `name COLLATE NOCASE ASC, uuid ASC`.

use crate::model::game::{GameId, UserId};
use crate::model::item::{Item, ItemId, ItemImage};
use crate::repo::sql::{bool_to_int, ensure_migrated, int_to_bool, parse_uuid};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

pub(crate) const ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    game_uuid,
    name,
    description,
    image_kind,
    image_value,
    xp,
    is_enabled,
    is_secret,
    is_tradable
FROM items";

/// Query options for listing a game's items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemListQuery {
    pub game_id: GameId,
    pub include_disabled: bool,
}

/// Repository interface for item definitions.
pub trait ItemRepository {
    fn create_item(&self, item: &Item) -> RepoResult<ItemId>;
    /// Replaces all mutable fields; the owning game cannot change.
    fn update_item(&self, item: &Item) -> RepoResult<()>;
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>>;
    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<Item>>;
    /// Enabled items the player may see: public ones plus owned secrets.
    fn list_items_for_player(&self, game_id: GameId, user_id: UserId) -> RepoResult<Vec<Item>>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_migrated(conn)?;
        Ok(Self { conn })
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create_item(&self, item: &Item) -> RepoResult<ItemId> {
        item.validate()?;
        let (image_kind, image_value) = image_to_db(&item.image);

        self.conn.execute(
            "INSERT INTO items (
                uuid,
                game_uuid,
                name,
                description,
                image_kind,
                image_value,
                xp,
                is_enabled,
                is_secret,
                is_tradable
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                item.id.to_string(),
                item.game_id.to_string(),
                item.name.trim(),
                item.description.as_str(),
                image_kind,
                image_value,
                item.xp,
                bool_to_int(item.is_enabled),
                bool_to_int(item.is_secret),
                bool_to_int(item.is_tradable),
            ],
        )?;

        Ok(item.id)
    }

    fn update_item(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;
        let (image_kind, image_value) = image_to_db(&item.image);

        let changed = self.conn.execute(
            "UPDATE items
             SET
                name = ?3,
                description = ?4,
                image_kind = ?5,
                image_value = ?6,
                xp = ?7,
                is_enabled = ?8,
                is_secret = ?9,
                is_tradable = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND game_uuid = ?2;",
            params![
                item.id.to_string(),
                item.game_id.to_string(),
                item.name.trim(),
                item.description.as_str(),
                image_kind,
                image_value,
                item.xp,
                bool_to_int(item.is_enabled),
                bool_to_int(item.is_secret),
                bool_to_int(item.is_tradable),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("item", item.id));
        }
        Ok(())
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        load_item(self.conn, id)
    }

    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE game_uuid = ?1
               AND (?2 = 1 OR is_enabled = 1)
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![
            query.game_id.to_string(),
            bool_to_int(query.include_disabled)
        ])?;
        collect_items(&mut rows)
    }

    fn list_items_for_player(&self, game_id: GameId, user_id: UserId) -> RepoResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE game_uuid = ?1
               AND is_enabled = 1
               AND (
                 is_secret = 0
                 OR EXISTS (
                    SELECT 1
                    FROM inventory inv
                    WHERE inv.item_uuid = items.uuid
                      AND inv.user_id = ?2
                 )
               )
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![game_id.to_string(), user_id])?;
        collect_items(&mut rows)
    }
}

pub(crate) fn load_item(conn: &Connection, id: ItemId) -> RepoResult<Option<Item>> {
    let mut stmt = conn.prepare(&format!("{ITEM_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_item_row(row)?)),
        None => Ok(None),
    }
}

fn collect_items(rows: &mut rusqlite::Rows<'_>) -> RepoResult<Vec<Item>> {
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_item_row(row)?);
    }
    Ok(items)
}

pub(crate) fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let uuid_text: String = row.get("uuid")?;
    let game_text: String = row.get("game_uuid")?;
    let image_kind: Option<String> = row.get("image_kind")?;
    let image_value: Option<String> = row.get("image_value")?;

    let image = match (image_kind.as_deref(), image_value) {
        (None, _) => ItemImage::None,
        (Some("emoji"), Some(value)) => ItemImage::Emoji(value),
        (Some("file"), Some(value)) => ItemImage::File(value),
        (Some(kind), _) => {
            return Err(RepoError::InvalidData(format!(
                "invalid image `{kind}` in items.image_kind for item {uuid_text}"
            )));
        }
    };

    Ok(Item {
        id: parse_uuid(&uuid_text, "items.uuid")?,
        game_id: parse_uuid(&game_text, "items.game_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        image,
        xp: row.get("xp")?,
        is_enabled: int_to_bool(row.get("is_enabled")?, "items.is_enabled")?,
        is_secret: int_to_bool(row.get("is_secret")?, "items.is_secret")?,
        is_tradable: int_to_bool(row.get("is_tradable")?, "items.is_tradable")?,
    })
}

fn image_to_db(image: &ItemImage) -> (Option<&'static str>, Option<&str>) {
    match image {
        ItemImage::None => (None, None),
        ItemImage::Emoji(value) => (Some("emoji"), Some(value.as_str())),
        ItemImage::File(value) => (Some("file"), Some(value.as_str())),
    }
}
