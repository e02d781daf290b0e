//! Drop management use-case service.
//!
//! # Responsibility
//! - Create drops with generated or custom codes.
//! - Edit limits and rotate codes.
//! - Resolve player-typed codes.
//!
//! # Invariants
//! - Custom codes are normalized before validation and storage.
//! - Generated codes are retried a bounded number of times on collision.

use crate::model::drop::{generate_drop_code, normalize_drop_code, DropId, ItemDrop};
use crate::model::game::GameId;
use crate::model::item::ItemId;
use crate::repo::drop_repo::DropRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::ServiceError;
use log::{info, warn};

/// Generated-code attempts before giving up with `CodeCollision`.
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// Usage limits of a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropLimits {
    /// Pickups per player; `0` is unlimited and pays no XP.
    pub max_usage: u32,
    pub cooldown_secs: u32,
}

impl Default for DropLimits {
    fn default() -> Self {
        Self {
            max_usage: 1,
            cooldown_secs: 0,
        }
    }
}

/// Drop service facade over repository implementations.
pub struct DropService<R: DropRepository> {
    repo: R,
}

impl<R: DropRepository> DropService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a drop for `item_id`.
    ///
    /// With `custom_code` the code is normalized and must be free in the
    /// game; without it a code is generated.
    pub fn create_drop(
        &self,
        game_id: GameId,
        item_id: ItemId,
        name: impl Into<String>,
        limits: DropLimits,
        custom_code: Option<&str>,
    ) -> Result<ItemDrop, ServiceError> {
        let name: String = name.into();
        let mut drop = ItemDrop::new(game_id, item_id, name.trim());
        drop.max_usage = limits.max_usage;
        drop.cooldown_secs = limits.cooldown_secs;

        let drop_id = match custom_code {
            Some(raw) => {
                drop.code = normalize_drop_code(raw);
                self.repo.create_drop(&drop)?
            }
            None => self.with_generated_code(&mut drop, |repo, drop| repo.create_drop(drop))?,
        };

        info!(
            "event=drop_create module=service status=ok game={game_id} drop={drop_id} item={item_id} max_usage={} cooldown_secs={}",
            limits.max_usage, limits.cooldown_secs
        );
        self.read_back(drop_id, "created drop not found in read-back")
    }

    pub fn rename_drop(
        &self,
        drop_id: DropId,
        name: impl Into<String>,
    ) -> Result<ItemDrop, ServiceError> {
        let name: String = name.into();
        let mut drop = self.require(drop_id)?;
        drop.name = name.trim().to_string();
        self.repo.update_drop(&drop)?;
        self.read_back(drop_id, "renamed drop not found in read-back")
    }

    /// Replaces usage limits. Past pickups keep counting against the new limit.
    pub fn update_limits(
        &self,
        drop_id: DropId,
        limits: DropLimits,
    ) -> Result<ItemDrop, ServiceError> {
        let mut drop = self.require(drop_id)?;
        drop.max_usage = limits.max_usage;
        drop.cooldown_secs = limits.cooldown_secs;
        self.repo.update_drop(&drop)?;
        self.read_back(drop_id, "updated drop not found in read-back")
    }

    pub fn set_code(&self, drop_id: DropId, raw_code: &str) -> Result<ItemDrop, ServiceError> {
        let mut drop = self.require(drop_id)?;
        drop.code = normalize_drop_code(raw_code);
        self.repo.update_drop(&drop)?;
        self.read_back(drop_id, "recoded drop not found in read-back")
    }

    /// Replaces the code with a fresh generated one, invalidating the old code.
    pub fn regenerate_code(&self, drop_id: DropId) -> Result<ItemDrop, ServiceError> {
        let mut drop = self.require(drop_id)?;
        self.with_generated_code(&mut drop, |repo, drop| repo.update_drop(drop))?;
        info!("event=drop_regenerate_code module=service status=ok drop={drop_id}");
        self.read_back(drop_id, "recoded drop not found in read-back")
    }

    /// Looks up a player-typed code inside one game.
    pub fn resolve_code(&self, game_id: GameId, raw_code: &str) -> RepoResult<Option<ItemDrop>> {
        self.repo
            .get_drop_by_code(game_id, &normalize_drop_code(raw_code))
    }

    pub fn get_drop(&self, drop_id: DropId) -> RepoResult<Option<ItemDrop>> {
        self.repo.get_drop(drop_id)
    }

    pub fn list_drops(&self, game_id: GameId) -> RepoResult<Vec<ItemDrop>> {
        self.repo.list_drops(game_id)
    }

    pub fn list_drops_for_item(&self, item_id: ItemId) -> RepoResult<Vec<ItemDrop>> {
        self.repo.list_drops_for_item(item_id)
    }

    fn with_generated_code<T, F>(&self, drop: &mut ItemDrop, mut write: F) -> Result<T, ServiceError>
    where
        F: FnMut(&R, &ItemDrop) -> RepoResult<T>,
    {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            drop.code = generate_drop_code();
            match write(&self.repo, drop) {
                Err(RepoError::DuplicateDropCode(code)) => {
                    warn!(
                        "event=drop_code_generate module=service status=retry drop={} attempt={attempt}",
                        drop.id
                    );
                    if attempt == MAX_CODE_ATTEMPTS {
                        return Err(ServiceError::CodeCollision(code));
                    }
                }
                other => return other.map_err(Into::into),
            }
        }
        Err(ServiceError::CodeCollision(drop.code.clone()))
    }

    fn require(&self, drop_id: DropId) -> Result<ItemDrop, ServiceError> {
        self.repo
            .get_drop(drop_id)?
            .ok_or_else(|| ServiceError::not_found("drop", drop_id))
    }

    fn read_back(&self, drop_id: DropId, details: &'static str) -> Result<ItemDrop, ServiceError> {
        self.repo
            .get_drop(drop_id)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}

#[cfg(test)]
mod tests {
    use super::{DropLimits, DropService, MAX_CODE_ATTEMPTS};
    use crate::model::drop::{DropId, ItemDrop};
    use crate::model::game::GameId;
    use crate::model::item::ItemId;
    use crate::repo::drop_repo::DropRepository;
    use crate::repo::{RepoError, RepoResult};
    use crate::service::ServiceError;
    use std::cell::RefCell;
    use uuid::Uuid;

    /// Rejects every code as taken.
    #[derive(Default)]
    struct CollidingRepo {
        attempts: RefCell<u32>,
    }

    impl DropRepository for CollidingRepo {
        fn create_drop(&self, drop: &ItemDrop) -> RepoResult<DropId> {
            *self.attempts.borrow_mut() += 1;
            Err(RepoError::DuplicateDropCode(drop.code.clone()))
        }
        fn update_drop(&self, _drop: &ItemDrop) -> RepoResult<()> {
            unreachable!("not used")
        }
        fn get_drop(&self, _id: DropId) -> RepoResult<Option<ItemDrop>> {
            Ok(None)
        }
        fn get_drop_by_code(&self, _game_id: GameId, _code: &str) -> RepoResult<Option<ItemDrop>> {
            Ok(None)
        }
        fn list_drops(&self, _game_id: GameId) -> RepoResult<Vec<ItemDrop>> {
            Ok(Vec::new())
        }
        fn list_drops_for_item(&self, _item_id: ItemId) -> RepoResult<Vec<ItemDrop>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn generated_code_gives_up_after_bounded_attempts() {
        let service = DropService::new(CollidingRepo::default());
        let err = service
            .create_drop(Uuid::new_v4(), Uuid::new_v4(), "Library", DropLimits::default(), None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::CodeCollision(_)));
        assert_eq!(*service.repo.attempts.borrow(), MAX_CODE_ATTEMPTS);
    }

    #[test]
    fn custom_code_collision_is_not_retried() {
        let service = DropService::new(CollidingRepo::default());
        let err = service
            .create_drop(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "Library",
                DropLimits::default(),
                Some("shelf42"),
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::CodeCollision(code) if code == "SHELF42"));
        assert_eq!(*service.repo.attempts.borrow(), 1);
    }
}
