//! Domain model for games, players, items, drops, inventory and quests.
//!
//! # Responsibility
//! - Define canonical records used by repositories and services.
//! - Own the pure rules: leveling, availability gating, goal evaluation,
//!   ranking.
//!
//! # Invariants
//! - Game-owned records are identified by a stable `Uuid`.
//! - Host users are identified by their numeric host id.
//! - Timestamps are Unix epoch milliseconds.

pub mod drop;
pub mod game;
pub mod inventory;
pub mod item;
pub mod player;
pub mod quest;
pub mod ranking;
pub mod validation;
