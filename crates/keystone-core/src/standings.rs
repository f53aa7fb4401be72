//! # Standings
//!
//! Tournament ranking of players by their win/loss record.
//!
//! ## Ordering
//! ```text
//! 1. wins       descending
//! 2. win rate   descending   (wins / games, 0 with no games)
//! 3. losses     ascending
//! 4. name       ascending    (display order only, never splits a rank)
//! ```
//!
//! Players equal on the first three keys share a rank and the next rank
//! skips ahead (1, 2, 2, 4).
//!
//! Two entry points:
//! - [`rank_standings`] sorts players into the leaderboard.
//! - [`apply_stable_ranks`] stamps the same rank numbers onto players but
//!   keeps the list in the order it was given (roster tables).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Player;

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Standing {
    pub rank: u32,
    pub player_id: String,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
}

impl Standing {
    fn from_player(player: &Player, rank: u32) -> Self {
        Standing {
            rank,
            player_id: player.id.clone(),
            name: player.name.clone(),
            wins: player.wins,
            losses: player.losses,
            win_rate: player.win_rate(),
        }
    }
}

/// Compares win rates exactly via cross-multiplication.
fn compare_win_rate(a: &Player, b: &Player) -> Ordering {
    let (a_wins, a_games) = (a.wins as u64, a.games() as u64);
    let (b_wins, b_games) = (b.wins as u64, b.games() as u64);
    match (a_games, b_games) {
        (0, 0) => Ordering::Equal,
        (0, _) => 0.cmp(&b_wins),
        (_, 0) => a_wins.cmp(&0),
        _ => (a_wins * b_games).cmp(&(b_wins * a_games)),
    }
}

/// Ranking keys only; `Equal` means the players share a rank.
fn compare_record(a: &Player, b: &Player) -> Ordering {
    b.wins
        .cmp(&a.wins)
        .then_with(|| compare_win_rate(b, a))
        .then_with(|| a.losses.cmp(&b.losses))
}

fn compare_display(a: &Player, b: &Player) -> Ordering {
    compare_record(a, b).then_with(|| a.name.cmp(&b.name))
}

/// Indices of `players` sorted best first, with competition ranks.
fn ranked(players: &[Player]) -> Vec<(u32, usize)> {
    let mut order: Vec<usize> = (0..players.len()).collect();
    order.sort_by(|&a, &b| compare_display(&players[a], &players[b]));

    let mut out: Vec<(u32, usize)> = Vec::with_capacity(order.len());
    for (position, index) in order.into_iter().enumerate() {
        let rank = match out.last() {
            Some(&(prev_rank, prev))
                if compare_record(&players[prev], &players[index]) == Ordering::Equal =>
            {
                prev_rank
            }
            _ => position as u32 + 1,
        };
        out.push((rank, index));
    }
    out
}

/// Builds the leaderboard.
///
/// ## Example
/// ```rust
/// use keystone_core::standings::rank_standings;
/// use keystone_core::types::Player;
///
/// let players = vec![
///     Player::new("Bo", 2, 2),
///     Player::new("Ana", 5, 1),
/// ];
/// let table = rank_standings(&players);
/// assert_eq!(table[0].name, "Ana");
/// assert_eq!(table[1].rank, 2);
/// ```
pub fn rank_standings(players: &[Player]) -> Vec<Standing> {
    ranked(players)
        .into_iter()
        .map(|(rank, index)| Standing::from_player(&players[index], rank))
        .collect()
}

/// Returns the players in their original order with `rank` filled in.
///
/// Ranks are the ones [`rank_standings`] would assign.
pub fn apply_stable_ranks(players: &[Player]) -> Vec<Player> {
    let mut ranked_players = players.to_vec();
    for (rank, index) in ranked(players) {
        ranked_players[index].rank = Some(rank);
    }
    ranked_players
}

// =============================================================================
// Unit Tests
// =============================================================================
