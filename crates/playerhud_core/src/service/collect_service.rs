//! Item collection use-case service.
//!
//! # Responsibility
//! - Turn player-typed codes into collection requests.
//! - Emit one `drop_collect` / `item_grant` event per attempt.
//!
//! # Invariants
//! - Malformed codes are rejected as `DropNotFound` without a write.
//! - Log lines carry ids and outcome codes only, never raw input.

use crate::model::drop::{normalize_drop_code, validate_drop_code, DropId};
use crate::model::game::{GameId, UserId};
use crate::model::item::ItemId;
use crate::repo::collect_repo::{
    CollectError, CollectReceipt, CollectRepository, CollectRequest, DropLocator, GrantRequest,
};
use log::{error, info};
use std::time::Instant;

/// Collection service facade over repository implementations.
pub struct CollectService<R: CollectRepository> {
    repo: R,
}

impl<R: CollectRepository> CollectService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Redeems a code typed by a player.
    pub fn collect_by_code(
        &mut self,
        game_id: GameId,
        user_id: UserId,
        raw_code: &str,
        now_ms: i64,
    ) -> Result<CollectReceipt, CollectError> {
        let code = normalize_drop_code(raw_code);
        if validate_drop_code(&code).is_err() {
            info!(
                "event=drop_collect module=service status=rejected game={game_id} user={user_id} error_code=drop_not_found"
            );
            return Err(CollectError::DropNotFound(DropLocator::Code(code)));
        }
        self.collect(CollectRequest {
            game_id,
            user_id,
            drop: DropLocator::Code(code),
            now_ms,
        })
    }

    /// Redeems a drop addressed by id (e.g. from a scanned link).
    pub fn collect_drop(
        &mut self,
        game_id: GameId,
        user_id: UserId,
        drop_id: DropId,
        now_ms: i64,
    ) -> Result<CollectReceipt, CollectError> {
        self.collect(CollectRequest {
            game_id,
            user_id,
            drop: DropLocator::Id(drop_id),
            now_ms,
        })
    }

    /// Hands an item to a player outside any drop.
    pub fn grant_item(
        &mut self,
        game_id: GameId,
        user_id: UserId,
        item_id: ItemId,
        now_ms: i64,
    ) -> Result<CollectReceipt, CollectError> {
        let started_at = Instant::now();
        let result = self.repo.grant_item(&GrantRequest {
            game_id,
            user_id,
            item_id,
            now_ms,
        });
        log_outcome("item_grant", game_id, user_id, started_at, &result);
        result
    }

    fn collect(&mut self, request: CollectRequest) -> Result<CollectReceipt, CollectError> {
        let started_at = Instant::now();
        let result = self.repo.collect_drop(&request);
        log_outcome(
            "drop_collect",
            request.game_id,
            request.user_id,
            started_at,
            &result,
        );
        result
    }
}

fn log_outcome(
    event: &'static str,
    game_id: GameId,
    user_id: UserId,
    started_at: Instant,
    result: &Result<CollectReceipt, CollectError>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(receipt) => info!(
            "event={event} module=service status=ok game={game_id} user={user_id} item={} xp_awarded={} total_xp={} leveled_up={} duration_ms={duration_ms}",
            receipt.item.id,
            receipt.xp_awarded,
            receipt.total_xp,
            receipt.leveled_up()
        ),
        Err(err @ CollectError::Repo(_)) => error!(
            "event={event} module=service status=error game={game_id} user={user_id} error_code={} duration_ms={duration_ms} error={err}",
            err.code()
        ),
        Err(err) => info!(
            "event={event} module=service status=rejected game={game_id} user={user_id} error_code={} duration_ms={duration_ms}",
            err.code()
        ),
    }
}
