//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep host integrations decoupled from storage details.
//! - Emit one structured log event per state-changing use-case.

pub mod collect_service;
pub mod drop_service;
mod error;
pub mod game_service;
pub mod item_service;
pub mod player_service;
pub mod quest_service;

pub use error::ServiceError;
