//! Transactional item collection.
//!
//! # Responsibility
//! - Redeem drops and manager grants as single commit-or-rollback units.
//!
//! # Invariants
//! - Availability checks read prior inventory rows inside the same
//!   IMMEDIATE transaction that appends the new row.
//! - XP is credited in that same transaction, never elsewhere.
//! - Unlimited drops (`max_usage == 0`) append rows with zero XP.
//! - Disabled items are never handed out, by drop or by grant.
//! - Any rejection rolls back, including first-contact player creation.

use crate::model::drop::{DropId, DropRejection, ItemDrop};
use crate::model::game::{GameId, GameSettings, UserId};
use crate::model::inventory::{InventoryEntry, InventorySource};
use crate::model::item::{Item, ItemId};
use crate::repo::drop_repo::{load_drop, load_drop_by_code};
use crate::repo::game_repo::load_settings;
use crate::repo::item_repo::load_item;
use crate::repo::ledger::{
    append_inventory, credit_xp, drop_usage, ensure_player_row, NewInventoryEntry,
};
use crate::repo::sql::ensure_migrated;
use crate::repo::RepoError;
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How the player addressed the drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropLocator {
    Id(DropId),
    /// Normalized (uppercase) drop code.
    Code(String),
}

impl Display for DropLocator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Code(code) => write!(f, "code {code}"),
        }
    }
}

/// One drop redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectRequest {
    pub game_id: GameId,
    pub user_id: UserId,
    pub drop: DropLocator,
    /// Epoch milliseconds of the attempt; stamps the inventory row.
    pub now_ms: i64,
}

/// One manager grant of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRequest {
    pub game_id: GameId,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub now_ms: i64,
}

/// Outcome of a committed collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectReceipt {
    pub entry: InventoryEntry,
    pub item: Item,
    pub xp_awarded: i64,
    /// Player XP after the credit.
    pub total_xp: i64,
    pub level_before: i64,
    pub level_after: i64,
}

impl CollectReceipt {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

/// Rejections and failures of a collection attempt.
#[derive(Debug)]
pub enum CollectError {
    GameNotFound(GameId),
    DropNotFound(DropLocator),
    ItemNotFound(ItemId),
    ItemDisabled(ItemId),
    PlayerDisabled { game_id: GameId, user_id: UserId },
    LimitReached { drop_id: DropId, max_usage: u32 },
    CooldownActive { drop_id: DropId, remaining_secs: u64 },
    Repo(RepoError),
}

impl CollectError {
    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::GameNotFound(_) => "game_not_found",
            Self::DropNotFound(_) => "drop_not_found",
            Self::ItemNotFound(_) => "item_not_found",
            Self::ItemDisabled(_) => "item_disabled",
            Self::PlayerDisabled { .. } => "player_disabled",
            Self::LimitReached { .. } => "limit_reached",
            Self::CooldownActive { .. } => "cooldown_active",
            Self::Repo(_) => "storage_error",
        }
    }

    fn from_rejection(drop_id: DropId, rejection: DropRejection) -> Self {
        match rejection {
            DropRejection::LimitReached { max_usage } => Self::LimitReached { drop_id, max_usage },
            DropRejection::CooldownActive { remaining_secs } => Self::CooldownActive {
                drop_id,
                remaining_secs,
            },
        }
    }
}

impl Display for CollectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GameNotFound(id) => write!(f, "game not found: {id}"),
            Self::DropNotFound(locator) => write!(f, "drop not found: {locator}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::ItemDisabled(id) => write!(f, "item is disabled: {id}"),
            Self::PlayerDisabled { game_id, user_id } => {
                write!(f, "player {user_id} opted out of game {game_id}")
            }
            Self::LimitReached { drop_id, max_usage } => {
                write!(f, "drop {drop_id} limit of {max_usage} pickups reached")
            }
            Self::CooldownActive {
                drop_id,
                remaining_secs,
            } => write!(f, "drop {drop_id} available again in {remaining_secs}s"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CollectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CollectError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for CollectError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Repository interface for XP-granting item collection.
pub trait CollectRepository {
    fn collect_drop(&mut self, request: &CollectRequest) -> Result<CollectReceipt, CollectError>;
    fn grant_item(&mut self, request: &GrantRequest) -> Result<CollectReceipt, CollectError>;
}

/// SQLite-backed collection repository.
pub struct SqliteCollectRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteCollectRepository<'conn> {
    pub fn try_new(conn: &'conn mut Connection) -> Result<Self, RepoError> {
        ensure_migrated(conn)?;
        Ok(Self { conn })
    }
}

impl CollectRepository for SqliteCollectRepository<'_> {
    fn collect_drop(&mut self, request: &CollectRequest) -> Result<CollectReceipt, CollectError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let settings = require_settings(&tx, request.game_id)?;
        let drop = resolve_drop(&tx, request)?;
        let item = load_item(&tx, drop.item_id)?.ok_or(CollectError::ItemNotFound(drop.item_id))?;
        if !item.is_enabled {
            return Err(CollectError::ItemDisabled(item.id));
        }

        let player = ensure_player_row(&tx, request.game_id, request.user_id, request.now_ms)?;
        if !player.is_enabled {
            return Err(CollectError::PlayerDisabled {
                game_id: request.game_id,
                user_id: request.user_id,
            });
        }

        let usage = drop_usage(&tx, drop.id, request.user_id)?;
        drop.check_availability(usage, request.now_ms)
            .map_err(|rejection| CollectError::from_rejection(drop.id, rejection))?;

        let xp_awarded = if drop.grants_xp() { item.xp } else { 0 };
        let entry = append_inventory(
            &tx,
            &NewInventoryEntry {
                game_id: request.game_id,
                user_id: request.user_id,
                item_id: item.id,
                drop_id: Some(drop.id),
                source: InventorySource::Drop,
                xp_awarded,
                created_at: request.now_ms,
            },
        )?;
        let total_xp = credit_xp(
            &tx,
            request.game_id,
            request.user_id,
            xp_awarded,
            request.now_ms,
        )?;

        tx.commit()?;
        Ok(receipt(&settings, player.xp, entry, item, total_xp))
    }

    fn grant_item(&mut self, request: &GrantRequest) -> Result<CollectReceipt, CollectError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let settings = require_settings(&tx, request.game_id)?;
        let item = load_item(&tx, request.item_id)?
            .filter(|item| item.game_id == request.game_id)
            .ok_or(CollectError::ItemNotFound(request.item_id))?;
        if !item.is_enabled {
            return Err(CollectError::ItemDisabled(item.id));
        }

        let player = ensure_player_row(&tx, request.game_id, request.user_id, request.now_ms)?;
        if !player.is_enabled {
            return Err(CollectError::PlayerDisabled {
                game_id: request.game_id,
                user_id: request.user_id,
            });
        }

        let entry = append_inventory(
            &tx,
            &NewInventoryEntry {
                game_id: request.game_id,
                user_id: request.user_id,
                item_id: item.id,
                drop_id: None,
                source: InventorySource::Grant,
                xp_awarded: item.xp,
                created_at: request.now_ms,
            },
        )?;
        let total_xp = credit_xp(
            &tx,
            request.game_id,
            request.user_id,
            item.xp,
            request.now_ms,
        )?;

        tx.commit()?;
        Ok(receipt(&settings, player.xp, entry, item, total_xp))
    }
}

fn require_settings(conn: &Connection, game_id: GameId) -> Result<GameSettings, CollectError> {
    load_settings(conn, game_id)?.ok_or(CollectError::GameNotFound(game_id))
}

fn resolve_drop(conn: &Connection, request: &CollectRequest) -> Result<ItemDrop, CollectError> {
    let found = match &request.drop {
        DropLocator::Id(id) => load_drop(conn, *id)?,
        DropLocator::Code(code) => load_drop_by_code(conn, request.game_id, code)?,
    };
    found
        .filter(|drop| drop.game_id == request.game_id)
        .ok_or_else(|| CollectError::DropNotFound(request.drop.clone()))
}

fn receipt(
    settings: &GameSettings,
    xp_before: i64,
    entry: InventoryEntry,
    item: Item,
    total_xp: i64,
) -> CollectReceipt {
    CollectReceipt {
        xp_awarded: entry.xp_awarded,
        entry,
        item,
        total_xp,
        level_before: settings.level_for_xp(xp_before),
        level_after: settings.level_for_xp(total_xp),
    }
}
