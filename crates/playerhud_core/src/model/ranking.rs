//! Leaderboard ranking.
//!
//! A player's rank is one plus the number of players with strictly more XP,
//! or equal XP reached earlier. Equal XP reached at the same instant shares
//! a rank.

use crate::model::game::UserId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Minimal ranking input for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    pub user_id: UserId,
    pub xp: i64,
    pub xp_updated_at: i64,
}

/// Ranked leaderboard row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: u32,
    pub entry: RankEntry,
}

impl RankEntry {
    fn outranks(&self, other: &RankEntry) -> bool {
        self.xp > other.xp || (self.xp == other.xp && self.xp_updated_at < other.xp_updated_at)
    }
}

/// Computes `target`'s rank inside `field`.
///
/// `field` may or may not contain `target`; an entry with the same user id
/// is skipped.
pub fn rank_of(target: &RankEntry, field: &[RankEntry]) -> u32 {
    let ahead = field
        .iter()
        .filter(|other| other.user_id != target.user_id && other.outranks(target))
        .count();
    ahead as u32 + 1
}

/// Leaderboard display order: XP desc, earliest arrival first, then user id.
pub fn leaderboard_order(a: &RankEntry, b: &RankEntry) -> Ordering {
    b.xp.cmp(&a.xp)
        .then(a.xp_updated_at.cmp(&b.xp_updated_at))
        .then(a.user_id.cmp(&b.user_id))
}

/// Sorts `entries` for display and assigns ranks.
pub fn rank_entries(mut entries: Vec<RankEntry>) -> Vec<RankedEntry> {
    entries.sort_by(leaderboard_order);

    let mut ranked: Vec<RankedEntry> = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let rank = match ranked.last() {
            Some(prev)
                if prev.entry.xp == entry.xp && prev.entry.xp_updated_at == entry.xp_updated_at =>
            {
                prev.rank
            }
            _ => index as u32 + 1,
        };
        ranked.push(RankedEntry { rank, entry });
    }
    ranked
}
