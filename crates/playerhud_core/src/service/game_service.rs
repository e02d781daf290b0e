//! Game use-case service.
//!
//! # Invariants
//! - Settings are validated before any write.
//! - Every write is followed by a read-back so callers see stored values.

use crate::model::game::{CourseId, Game, GameId, GameSettings};
use crate::repo::game_repo::GameRepository;
use crate::repo::RepoResult;
use crate::service::ServiceError;
use log::info;

/// Game service facade over repository implementations.
pub struct GameService<R: GameRepository> {
    repo: R,
}

impl<R: GameRepository> GameService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one game for a course with the given economy settings.
    pub fn create_game(
        &self,
        course_id: CourseId,
        name: impl Into<String>,
        settings: GameSettings,
    ) -> Result<Game, ServiceError> {
        let name: String = name.into();
        let mut game = Game::new(course_id, name.trim());
        game.settings = settings;
        game.validate()?;

        let game_id = self.repo.create_game(&game)?;
        info!("event=game_create module=service status=ok course_id={course_id} game={game_id}");
        self.read_back(game_id, "created game not found in read-back")
    }

    pub fn get_game(&self, game_id: GameId) -> RepoResult<Option<Game>> {
        self.repo.get_game(game_id)
    }

    pub fn list_games(&self, course_id: CourseId) -> RepoResult<Vec<Game>> {
        self.repo.list_games(course_id)
    }

    /// Replaces the economy settings of one game.
    ///
    /// Existing XP totals are untouched; levels are derived on read.
    pub fn update_settings(
        &self,
        game_id: GameId,
        settings: GameSettings,
    ) -> Result<Game, ServiceError> {
        settings.validate()?;
        let mut game = self.require(game_id)?;
        game.settings = settings;
        self.repo.update_game(&game)?;
        info!(
            "event=game_update module=service status=ok game={game_id} xp_per_level={} max_level={} ranking_enabled={}",
            settings.xp_per_level, settings.max_level, settings.ranking_enabled
        );
        self.read_back(game_id, "updated game not found in read-back")
    }

    pub fn rename_game(
        &self,
        game_id: GameId,
        name: impl Into<String>,
    ) -> Result<Game, ServiceError> {
        let name: String = name.into();
        let mut game = self.require(game_id)?;
        game.name = name.trim().to_string();
        game.validate()?;
        self.repo.update_game(&game)?;
        self.read_back(game_id, "renamed game not found in read-back")
    }

    fn require(&self, game_id: GameId) -> Result<Game, ServiceError> {
        self.repo
            .get_game(game_id)?
            .ok_or_else(|| ServiceError::not_found("game", game_id))
    }

    fn read_back(&self, game_id: GameId, details: &'static str) -> Result<Game, ServiceError> {
        self.repo
            .get_game(game_id)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}
