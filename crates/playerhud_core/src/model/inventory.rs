//! Inventory ledger entries.
//!
//! # Invariants
//! - Rows are append-only; storage rejects UPDATE and DELETE.
//! - `drop_id` is set only for `InventorySource::Drop`.

use crate::model::drop::DropId;
use crate::model::game::{GameId, UserId};
use crate::model::item::ItemId;
use serde::{Deserialize, Serialize};

/// How an item reached a player's inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventorySource {
    /// Redeemed from a drop code.
    Drop,
    /// Reward from a claimed quest.
    Quest,
    /// Handed out directly by a course manager.
    Grant,
}

impl InventorySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Quest => "quest",
            Self::Grant => "grant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "drop" => Some(Self::Drop),
            "quest" => Some(Self::Quest),
            "grant" => Some(Self::Grant),
            _ => None,
        }
    }
}

/// One collection event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Insertion-ordered ledger id.
    pub id: i64,
    pub game_id: GameId,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub drop_id: Option<DropId>,
    pub source: InventorySource,
    /// XP credited together with this row.
    pub xp_awarded: i64,
    pub created_at: i64,
}
