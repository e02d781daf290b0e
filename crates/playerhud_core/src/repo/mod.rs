//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQL details from service orchestration.
//!
//! # Invariants
//! - Write paths call the model `validate()` before SQL mutations.
//! - Player XP is only written by `collect_repo` and `quest_repo`
//!   transactions, together with the row that justifies it.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod collect_repo;
pub mod drop_repo;
mod error;
pub mod game_repo;
pub mod item_repo;
mod ledger;
pub mod player_repo;
pub mod quest_repo;
mod sql;

pub use error::{RepoError, RepoResult};
