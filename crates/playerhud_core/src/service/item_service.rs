//! Item catalogue use-case service.
//!
//! # Responsibility
//! - Create and edit item definitions from raw manager input.
//! - Provide the manager listing and the player-facing catalogue.
//!
//! # Invariants
//! - Raw image input is classified through `ItemImage::parse` before storage.
//! - Items are disabled instead of deleted.

use crate::model::game::{GameId, UserId};
use crate::model::item::{Item, ItemId, ItemImage};
use crate::repo::item_repo::{ItemListQuery, ItemRepository};
use crate::repo::RepoResult;
use crate::service::ServiceError;
use log::info;

/// Editable item fields as entered by a manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInput {
    pub name: String,
    pub description: String,
    /// Emoji, image path, or blank for no image.
    pub image: String,
    pub xp: i64,
    pub is_enabled: bool,
    pub is_secret: bool,
    pub is_tradable: bool,
}

impl ItemInput {
    /// Enabled, public item with the given XP value and no image.
    pub fn new(name: impl Into<String>, xp: i64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            image: String::new(),
            xp,
            is_enabled: true,
            is_secret: false,
            is_tradable: false,
        }
    }

    fn apply_to(self, item: &mut Item) -> Result<(), ServiceError> {
        item.image = ItemImage::parse(&self.image)?;
        item.name = self.name.trim().to_string();
        item.description = self.description.trim().to_string();
        item.xp = self.xp;
        item.is_enabled = self.is_enabled;
        item.is_secret = self.is_secret;
        item.is_tradable = self.is_tradable;
        item.validate()?;
        Ok(())
    }
}

/// Item service facade over repository implementations.
pub struct ItemService<R: ItemRepository> {
    repo: R,
}

impl<R: ItemRepository> ItemService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_item(&self, game_id: GameId, input: ItemInput) -> Result<Item, ServiceError> {
        let mut item = Item::new(game_id, String::new(), 0);
        input.apply_to(&mut item)?;

        let item_id = self.repo.create_item(&item)?;
        info!(
            "event=item_create module=service status=ok game={game_id} item={item_id} xp={} secret={}",
            item.xp, item.is_secret
        );
        self.read_back(item_id, "created item not found in read-back")
    }

    /// Replaces all editable fields of one item.
    pub fn update_item(&self, item_id: ItemId, input: ItemInput) -> Result<Item, ServiceError> {
        let mut item = self.require(item_id)?;
        input.apply_to(&mut item)?;
        self.repo.update_item(&item)?;
        self.read_back(item_id, "updated item not found in read-back")
    }

    /// Hides an item from players and stops its drops from paying out.
    pub fn set_enabled(&self, item_id: ItemId, enabled: bool) -> Result<Item, ServiceError> {
        let mut item = self.require(item_id)?;
        item.is_enabled = enabled;
        self.repo.update_item(&item)?;
        self.read_back(item_id, "toggled item not found in read-back")
    }

    pub fn get_item(&self, item_id: ItemId) -> RepoResult<Option<Item>> {
        self.repo.get_item(item_id)
    }

    /// Manager listing, optionally including disabled items.
    pub fn list_items(&self, game_id: GameId, include_disabled: bool) -> RepoResult<Vec<Item>> {
        self.repo.list_items(&ItemListQuery {
            game_id,
            include_disabled,
        })
    }

    /// Items one player may see: enabled public items and owned secrets.
    pub fn catalogue_for_player(&self, game_id: GameId, user_id: UserId) -> RepoResult<Vec<Item>> {
        self.repo.list_items_for_player(game_id, user_id)
    }

    fn require(&self, item_id: ItemId) -> Result<Item, ServiceError> {
        self.repo
            .get_item(item_id)?
            .ok_or_else(|| ServiceError::not_found("item", item_id))
    }

    fn read_back(&self, item_id: ItemId, details: &'static str) -> Result<Item, ServiceError> {
        self.repo
            .get_item(item_id)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}
