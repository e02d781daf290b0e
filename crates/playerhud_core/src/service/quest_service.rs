//! Quest use-case service.
//!
//! # Responsibility
//! - Create and edit quests.
//! - Build each player's quest board with live progress.
//! - Run claims and log their outcome.
//!
//! # Invariants
//! - The quest board shows enabled quests only, oldest first.
//! - Board progress and claim evaluation use the same goal rules.

use crate::model::game::{GameId, UserId};
use crate::model::item::ItemId;
use crate::model::quest::{Quest, QuestGoal, QuestId, QuestStatus};
use crate::repo::quest_repo::{ClaimReceipt, ClaimRequest, QuestError, QuestRepository};
use crate::repo::{RepoError, RepoResult};
use log::{error, info};
use std::collections::HashSet;
use std::time::Instant;

/// Editable quest fields as entered by a manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestInput {
    pub name: String,
    pub description: String,
    pub goal: QuestGoal,
    pub reward_xp: i64,
    pub reward_item_id: Option<ItemId>,
    pub is_enabled: bool,
}

impl QuestInput {
    pub fn new(name: impl Into<String>, goal: QuestGoal, reward_xp: i64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            goal,
            reward_xp,
            reward_item_id: None,
            is_enabled: true,
        }
    }

    fn apply_to(self, quest: &mut Quest) {
        quest.name = self.name.trim().to_string();
        quest.description = self.description.trim().to_string();
        quest.goal = self.goal;
        quest.reward_xp = self.reward_xp;
        quest.reward_item_id = self.reward_item_id;
        quest.is_enabled = self.is_enabled;
    }
}

/// Quest service facade over repository implementations.
pub struct QuestService<R: QuestRepository> {
    repo: R,
}

impl<R: QuestRepository> QuestService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a quest stamped with `now_ms`.
    ///
    /// The stamp is compared against players' quest-view marks, so it must
    /// come from the same clock as `mark_quests_viewed`.
    pub fn create_quest(
        &self,
        game_id: GameId,
        input: QuestInput,
        now_ms: i64,
    ) -> Result<Quest, QuestError> {
        let mut quest = Quest::new(game_id, String::new(), input.goal, 0);
        quest.created_at = now_ms;
        input.apply_to(&mut quest);
        quest.validate()?;

        let quest_id = self.repo.create_quest(&quest)?;
        info!(
            "event=quest_create module=service status=ok game={game_id} quest={quest_id} goal={} reward_xp={}",
            quest.goal.type_name(),
            quest.reward_xp
        );
        self.read_back(quest_id)
    }

    /// Replaces all editable fields. Existing claims stay valid.
    pub fn update_quest(&self, quest_id: QuestId, input: QuestInput) -> Result<Quest, QuestError> {
        let mut quest = self
            .repo
            .get_quest(quest_id)?
            .ok_or(QuestError::QuestNotFound(quest_id))?;
        input.apply_to(&mut quest);
        quest.validate()?;
        self.repo.update_quest(&quest)?;
        self.read_back(quest_id)
    }

    pub fn get_quest(&self, quest_id: QuestId) -> RepoResult<Option<Quest>> {
        self.repo.get_quest(quest_id)
    }

    /// Manager listing, optionally including disabled quests.
    pub fn list_quests(&self, game_id: GameId, include_disabled: bool) -> RepoResult<Vec<Quest>> {
        self.repo.list_quests(game_id, include_disabled)
    }

    /// Enabled quests with the player's progress and claim state.
    pub fn quests_for_player(
        &self,
        game_id: GameId,
        user_id: UserId,
    ) -> RepoResult<Vec<QuestStatus>> {
        let snapshot = self.repo.player_snapshot(game_id, user_id)?;
        let claimed: HashSet<QuestId> = self
            .repo
            .list_claims(game_id, user_id)?
            .into_iter()
            .map(|claim| claim.quest_id)
            .collect();

        Ok(self
            .repo
            .list_quests(game_id, false)?
            .into_iter()
            .map(|quest| QuestStatus {
                progress: quest.goal.evaluate(&snapshot),
                claimed: claimed.contains(&quest.id),
                quest,
            })
            .collect())
    }

    /// Claims a completed quest and credits its rewards.
    pub fn claim(
        &mut self,
        game_id: GameId,
        user_id: UserId,
        quest_id: QuestId,
        now_ms: i64,
    ) -> Result<ClaimReceipt, QuestError> {
        let started_at = Instant::now();
        let result = self.repo.claim_quest(&ClaimRequest {
            game_id,
            user_id,
            quest_id,
            now_ms,
        });

        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(receipt) => info!(
                "event=quest_claim module=service status=ok game={game_id} user={user_id} quest={quest_id} reward_xp={} total_xp={} leveled_up={} duration_ms={duration_ms}",
                receipt.claim.reward_xp,
                receipt.total_xp,
                receipt.leveled_up()
            ),
            Err(err @ QuestError::Repo(_)) => error!(
                "event=quest_claim module=service status=error game={game_id} user={user_id} quest={quest_id} error_code={} duration_ms={duration_ms} error={err}",
                err.code()
            ),
            Err(err) => info!(
                "event=quest_claim module=service status=rejected game={game_id} user={user_id} quest={quest_id} error_code={} duration_ms={duration_ms}",
                err.code()
            ),
        }
        result
    }

    fn read_back(&self, quest_id: QuestId) -> Result<Quest, QuestError> {
        self.repo.get_quest(quest_id)?.ok_or_else(|| {
            QuestError::Repo(RepoError::InvalidData(format!(
                "quest {quest_id} missing in read-back"
            )))
        })
    }
}
