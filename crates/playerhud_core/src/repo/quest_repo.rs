//! Quest repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist quest definitions and the claim log.
//! - Run quest claims as one commit-or-rollback unit.
//!
//! # Invariants
//! - Goal and reward items belong to the quest's game.
//! - A claim appends its log row, its reward inventory row and its XP credit
//!   in the same IMMEDIATE transaction, after re-evaluating the goal there.
//! - `UNIQUE (quest_uuid, user_id)` backs the one-claim-per-player rule.

use crate::model::game::{GameId, GameSettings, UserId};
use crate::model::inventory::{InventoryEntry, InventorySource};
use crate::model::item::ItemId;
use crate::model::player::Player;
use crate::model::quest::{PlayerSnapshot, Quest, QuestClaim, QuestGoal, QuestId};
use crate::model::validation::ValidationError;
use crate::repo::game_repo::load_settings;
use crate::repo::item_repo::load_item;
use crate::repo::ledger::{
    append_inventory, credit_xp, ensure_player_row, load_player, player_snapshot,
    NewInventoryEntry,
};
use crate::repo::sql::{bool_to_int, ensure_migrated, int_to_bool, parse_optional_uuid, parse_uuid};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const QUEST_SELECT_SQL: &str = "SELECT
    uuid,
    game_uuid,
    name,
    description,
    goal_type,
    goal_value,
    goal_item_uuid,
    reward_xp,
    reward_item_uuid,
    is_enabled,
    created_at
FROM quests";

const CLAIM_SELECT_SQL: &str = "SELECT
    id,
    quest_uuid,
    game_uuid,
    user_id,
    reward_xp,
    reward_item_uuid,
    claimed_at
FROM quest_claims";

/// One claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    pub game_id: GameId,
    pub user_id: UserId,
    pub quest_id: QuestId,
    pub now_ms: i64,
}

/// Outcome of a committed claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub claim: QuestClaim,
    pub reward_entry: Option<InventoryEntry>,
    pub total_xp: i64,
    pub level_before: i64,
    pub level_after: i64,
}

impl ClaimReceipt {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

/// Rejections and failures of quest operations.
#[derive(Debug)]
pub enum QuestError {
    GameNotFound(GameId),
    QuestNotFound(QuestId),
    QuestDisabled(QuestId),
    PlayerDisabled { game_id: GameId, user_id: UserId },
    AlreadyClaimed(QuestId),
    NotComplete { current: i64, target: i64 },
    Validation(ValidationError),
    Repo(RepoError),
}

impl QuestError {
    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::GameNotFound(_) => "game_not_found",
            Self::QuestNotFound(_) => "quest_not_found",
            Self::QuestDisabled(_) => "quest_disabled",
            Self::PlayerDisabled { .. } => "player_disabled",
            Self::AlreadyClaimed(_) => "already_claimed",
            Self::NotComplete { .. } => "not_complete",
            Self::Validation(_) => "validation_failed",
            Self::Repo(_) => "storage_error",
        }
    }
}

impl Display for QuestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GameNotFound(id) => write!(f, "game not found: {id}"),
            Self::QuestNotFound(id) => write!(f, "quest not found: {id}"),
            Self::QuestDisabled(id) => write!(f, "quest is disabled: {id}"),
            Self::PlayerDisabled { game_id, user_id } => {
                write!(f, "player {user_id} opted out of game {game_id}")
            }
            Self::AlreadyClaimed(id) => write!(f, "quest already claimed: {id}"),
            Self::NotComplete { current, target } => {
                write!(f, "quest goal not met: {current}/{target}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QuestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for QuestError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for QuestError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for QuestError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Repository interface for quests and claims.
pub trait QuestRepository {
    fn create_quest(&self, quest: &Quest) -> RepoResult<QuestId>;
    /// Replaces all mutable fields; the owning game cannot change.
    fn update_quest(&self, quest: &Quest) -> RepoResult<()>;
    fn get_quest(&self, id: QuestId) -> RepoResult<Option<Quest>>;
    /// Lists quests oldest first.
    fn list_quests(&self, game_id: GameId, include_disabled: bool) -> RepoResult<Vec<Quest>>;
    fn list_claims(&self, game_id: GameId, user_id: UserId) -> RepoResult<Vec<QuestClaim>>;
    /// Goal-evaluation input; players without a row evaluate as fresh.
    fn player_snapshot(&self, game_id: GameId, user_id: UserId) -> RepoResult<PlayerSnapshot>;
    fn claim_quest(&mut self, request: &ClaimRequest) -> Result<ClaimReceipt, QuestError>;
}

/// SQLite-backed quest repository.
pub struct SqliteQuestRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteQuestRepository<'conn> {
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_migrated(conn)?;
        Ok(Self { conn })
    }

    fn ensure_items_in_game(&self, quest: &Quest) -> RepoResult<()> {
        for item_id in [quest.goal.item_id(), quest.reward_item_id]
            .into_iter()
            .flatten()
        {
            let exists: i64 = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM items WHERE uuid = ?1 AND game_uuid = ?2);",
                params![item_id.to_string(), quest.game_id.to_string()],
                |row| row.get(0),
            )?;
            if exists != 1 {
                return Err(RepoError::not_found("item", item_id));
            }
        }
        Ok(())
    }
}

impl QuestRepository for SqliteQuestRepository<'_> {
    fn create_quest(&self, quest: &Quest) -> RepoResult<QuestId> {
        quest.validate()?;
        self.ensure_items_in_game(quest)?;

        self.conn.execute(
            "INSERT INTO quests (
                uuid,
                game_uuid,
                name,
                description,
                goal_type,
                goal_value,
                goal_item_uuid,
                reward_xp,
                reward_item_uuid,
                is_enabled,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11);",
            params![
                quest.id.to_string(),
                quest.game_id.to_string(),
                quest.name.trim(),
                quest.description.as_str(),
                quest.goal.type_name(),
                quest.goal.target_value(),
                quest.goal.item_id().map(|id| id.to_string()),
                quest.reward_xp,
                quest.reward_item_id.map(|id| id.to_string()),
                bool_to_int(quest.is_enabled),
                quest.created_at,
            ],
        )?;

        Ok(quest.id)
    }

    fn update_quest(&self, quest: &Quest) -> RepoResult<()> {
        quest.validate()?;
        self.ensure_items_in_game(quest)?;

        let changed = self.conn.execute(
            "UPDATE quests
             SET
                name = ?3,
                description = ?4,
                goal_type = ?5,
                goal_value = ?6,
                goal_item_uuid = ?7,
                reward_xp = ?8,
                reward_item_uuid = ?9,
                is_enabled = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND game_uuid = ?2;",
            params![
                quest.id.to_string(),
                quest.game_id.to_string(),
                quest.name.trim(),
                quest.description.as_str(),
                quest.goal.type_name(),
                quest.goal.target_value(),
                quest.goal.item_id().map(|id| id.to_string()),
                quest.reward_xp,
                quest.reward_item_id.map(|id| id.to_string()),
                bool_to_int(quest.is_enabled),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("quest", quest.id));
        }
        Ok(())
    }

    fn get_quest(&self, id: QuestId) -> RepoResult<Option<Quest>> {
        load_quest(self.conn, id)
    }

    fn list_quests(&self, game_id: GameId, include_disabled: bool) -> RepoResult<Vec<Quest>> {
        let mut stmt = self.conn.prepare(&format!(
            "{QUEST_SELECT_SQL}
             WHERE game_uuid = ?1
               AND (?2 = 1 OR is_enabled = 1)
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query(params![game_id.to_string(), bool_to_int(include_disabled)])?;
        let mut quests = Vec::new();
        while let Some(row) = rows.next()? {
            quests.push(parse_quest_row(row)?);
        }
        Ok(quests)
    }

    fn list_claims(&self, game_id: GameId, user_id: UserId) -> RepoResult<Vec<QuestClaim>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CLAIM_SELECT_SQL}
             WHERE game_uuid = ?1
               AND user_id = ?2
             ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query(params![game_id.to_string(), user_id])?;
        let mut claims = Vec::new();
        while let Some(row) = rows.next()? {
            claims.push(parse_claim_row(row)?);
        }
        Ok(claims)
    }

    fn player_snapshot(&self, game_id: GameId, user_id: UserId) -> RepoResult<PlayerSnapshot> {
        let settings =
            load_settings(self.conn, game_id)?.ok_or_else(|| RepoError::not_found("game", game_id))?;
        let player = load_player(self.conn, game_id, user_id)?
            .unwrap_or_else(|| Player::new(game_id, user_id, 0));
        player_snapshot(self.conn, &settings, &player)
    }

    fn claim_quest(&mut self, request: &ClaimRequest) -> Result<ClaimReceipt, QuestError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let settings: GameSettings =
            load_settings(&tx, request.game_id)?.ok_or(QuestError::GameNotFound(request.game_id))?;
        let quest = load_quest(&tx, request.quest_id)?
            .filter(|quest| quest.game_id == request.game_id)
            .ok_or(QuestError::QuestNotFound(request.quest_id))?;
        if !quest.is_enabled {
            return Err(QuestError::QuestDisabled(quest.id));
        }

        let player = ensure_player_row(&tx, request.game_id, request.user_id, request.now_ms)?;
        if !player.is_enabled {
            return Err(QuestError::PlayerDisabled {
                game_id: request.game_id,
                user_id: request.user_id,
            });
        }
        if claim_exists(&tx, quest.id, request.user_id)? {
            return Err(QuestError::AlreadyClaimed(quest.id));
        }

        let snapshot = player_snapshot(&tx, &settings, &player)?;
        let progress = quest.goal.evaluate(&snapshot);
        if !progress.complete {
            return Err(QuestError::NotComplete {
                current: progress.current,
                target: progress.target,
            });
        }

        let reward_item = match quest.reward_item_id {
            Some(item_id) => Some(
                load_item(&tx, item_id)?.ok_or_else(|| RepoError::not_found("item", item_id))?,
            ),
            None => None,
        };
        let item_xp = reward_item.as_ref().map_or(0, |item| item.xp);
        let total_reward = quest.reward_xp + item_xp;

        tx.execute(
            "INSERT INTO quest_claims (
                quest_uuid,
                game_uuid,
                user_id,
                reward_xp,
                reward_item_uuid,
                claimed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                quest.id.to_string(),
                request.game_id.to_string(),
                request.user_id,
                total_reward,
                quest.reward_item_id.map(|id| id.to_string()),
                request.now_ms,
            ],
        )?;
        let claim = QuestClaim {
            id: tx.last_insert_rowid(),
            quest_id: quest.id,
            game_id: request.game_id,
            user_id: request.user_id,
            reward_xp: total_reward,
            reward_item_id: quest.reward_item_id,
            claimed_at: request.now_ms,
        };

        let reward_entry = match reward_item {
            Some(item) => Some(append_inventory(
                &tx,
                &NewInventoryEntry {
                    game_id: request.game_id,
                    user_id: request.user_id,
                    item_id: item.id,
                    drop_id: None,
                    source: InventorySource::Quest,
                    xp_awarded: item.xp,
                    created_at: request.now_ms,
                },
            )?),
            None => None,
        };
        let total_xp = credit_xp(
            &tx,
            request.game_id,
            request.user_id,
            total_reward,
            request.now_ms,
        )?;

        tx.commit()?;
        Ok(ClaimReceipt {
            claim,
            reward_entry,
            total_xp,
            level_before: settings.level_for_xp(player.xp),
            level_after: settings.level_for_xp(total_xp),
        })
    }
}

fn load_quest(conn: &Connection, id: QuestId) -> RepoResult<Option<Quest>> {
    let mut stmt = conn.prepare(&format!("{QUEST_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_quest_row(row)?)),
        None => Ok(None),
    }
}

fn claim_exists(conn: &Connection, quest_id: QuestId, user_id: UserId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM quest_claims WHERE quest_uuid = ?1 AND user_id = ?2
        );",
        params![quest_id.to_string(), user_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_quest_row(row: &Row<'_>) -> RepoResult<Quest> {
    let uuid_text: String = row.get("uuid")?;
    let game_text: String = row.get("game_uuid")?;
    let goal_type: String = row.get("goal_type")?;
    let goal_value: i64 = row.get("goal_value")?;
    let goal_item: Option<ItemId> =
        parse_optional_uuid(row.get("goal_item_uuid")?, "quests.goal_item_uuid")?;
    let goal = QuestGoal::from_parts(&goal_type, goal_value, goal_item).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid goal `{goal_type}`/{goal_value} for quest {uuid_text}"
        ))
    })?;

    Ok(Quest {
        id: parse_uuid(&uuid_text, "quests.uuid")?,
        game_id: parse_uuid(&game_text, "quests.game_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        goal,
        reward_xp: row.get("reward_xp")?,
        reward_item_id: parse_optional_uuid(row.get("reward_item_uuid")?, "quests.reward_item_uuid")?,
        is_enabled: int_to_bool(row.get("is_enabled")?, "quests.is_enabled")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_claim_row(row: &Row<'_>) -> RepoResult<QuestClaim> {
    let quest_text: String = row.get("quest_uuid")?;
    let game_text: String = row.get("game_uuid")?;
    Ok(QuestClaim {
        id: row.get("id")?,
        quest_id: parse_uuid(&quest_text, "quest_claims.quest_uuid")?,
        game_id: parse_uuid(&game_text, "quest_claims.game_uuid")?,
        user_id: row.get("user_id")?,
        reward_xp: row.get("reward_xp")?,
        reward_item_id: parse_optional_uuid(
            row.get("reward_item_uuid")?,
            "quest_claims.reward_item_uuid",
        )?,
        claimed_at: row.get("claimed_at")?,
    })
}
