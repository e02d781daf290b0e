//! Game repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Settings are validated before every write.
//! - Games are never deleted; their ledgers must stay intact.

use crate::model::game::{CourseId, Game, GameId, GameSettings};
use crate::repo::sql::{bool_to_int, ensure_migrated, int_to_bool, parse_uuid};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const GAME_SELECT_SQL: &str = "SELECT
    uuid,
    course_id,
    name,
    xp_per_level,
    max_level,
    ranking_enabled,
    created_at,
    updated_at
FROM games";

/// Repository interface for game rows.
pub trait GameRepository {
    fn create_game(&self, game: &Game) -> RepoResult<GameId>;
    fn get_game(&self, id: GameId) -> RepoResult<Option<Game>>;
    /// Lists games of one course, oldest first.
    fn list_games(&self, course_id: CourseId) -> RepoResult<Vec<Game>>;
    /// Replaces name and settings.
    fn update_game(&self, game: &Game) -> RepoResult<()>;
}

/// SQLite-backed game repository.
pub struct SqliteGameRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGameRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_migrated(conn)?;
        Ok(Self { conn })
    }
}

impl GameRepository for SqliteGameRepository<'_> {
    fn create_game(&self, game: &Game) -> RepoResult<GameId> {
        game.validate()?;

        self.conn.execute(
            "INSERT INTO games (
                uuid,
                course_id,
                name,
                xp_per_level,
                max_level,
                ranking_enabled
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                game.id.to_string(),
                game.course_id,
                game.name.trim(),
                game.settings.xp_per_level,
                game.settings.max_level,
                bool_to_int(game.settings.ranking_enabled),
            ],
        )?;

        Ok(game.id)
    }

    fn get_game(&self, id: GameId) -> RepoResult<Option<Game>> {
        load_game(self.conn, id)
    }

    fn list_games(&self, course_id: CourseId) -> RepoResult<Vec<Game>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GAME_SELECT_SQL}
             WHERE course_id = ?1
             ORDER BY created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([course_id])?;
        let mut games = Vec::new();
        while let Some(row) = rows.next()? {
            games.push(parse_game_row(row)?);
        }
        Ok(games)
    }

    fn update_game(&self, game: &Game) -> RepoResult<()> {
        game.validate()?;

        let changed = self.conn.execute(
            "UPDATE games
             SET
                name = ?2,
                xp_per_level = ?3,
                max_level = ?4,
                ranking_enabled = ?5,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                game.id.to_string(),
                game.name.trim(),
                game.settings.xp_per_level,
                game.settings.max_level,
                bool_to_int(game.settings.ranking_enabled),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("game", game.id));
        }
        Ok(())
    }
}

pub(crate) fn load_game(conn: &Connection, id: GameId) -> RepoResult<Option<Game>> {
    let mut stmt = conn.prepare(&format!("{GAME_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_game_row(row)?)),
        None => Ok(None),
    }
}

/// Loads only the economy settings of one game.
pub(crate) fn load_settings(conn: &Connection, id: GameId) -> RepoResult<Option<GameSettings>> {
    let settings = conn
        .query_row(
            "SELECT xp_per_level, max_level, ranking_enabled FROM games WHERE uuid = ?1;",
            [id.to_string()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?;

    match settings {
        Some((xp_per_level, max_level, ranking_enabled)) => Ok(Some(GameSettings {
            xp_per_level,
            max_level,
            ranking_enabled: int_to_bool(ranking_enabled, "games.ranking_enabled")?,
        })),
        None => Ok(None),
    }
}

fn parse_game_row(row: &Row<'_>) -> RepoResult<Game> {
    let uuid_text: String = row.get("uuid")?;
    let game = Game {
        id: parse_uuid(&uuid_text, "games.uuid")?,
        course_id: row.get("course_id")?,
        name: row.get("name")?,
        settings: GameSettings {
            xp_per_level: row.get("xp_per_level")?,
            max_level: row.get("max_level")?,
            ranking_enabled: int_to_bool(row.get("ranking_enabled")?, "games.ranking_enabled")?,
        },
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    game.settings
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("game {}: {err}", game.id)))?;
    Ok(game)
}
