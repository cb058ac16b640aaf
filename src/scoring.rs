//! Territory counting and final scores.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::board::{Board, Player, Point};
use crate::rules::GameState;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PointStatus {
    Stone(Player),
    Territory(Player),
    Dame,
}

/// Per-point classification of a final position.
///
/// Every empty region is flood-filled; a region bordering stones of exactly
/// one color is that color's territory, anything else is dame. No life and
/// death judgement is made, so dead stones must already be off the board.
#[derive(Debug)]
pub struct Territory {
    status: HashMap<Point, PointStatus>,
}

impl Territory {
    pub fn evaluate(board: &Board) -> Territory {
        let mut status = HashMap::new();

        for &point in board.topology().points() {
            if status.contains_key(&point) {
                continue;
            }
            match board.player_at(point) {
                Some(player) => {
                    status.insert(point, PointStatus::Stone(player));
                }
                None => {
                    let (region, borders) = explore_region(board, point);
                    let owner = borders.iter().copied().next();
                    let verdict = match (borders.len(), owner) {
                        (1, Some(player)) => PointStatus::Territory(player),
                        _ => PointStatus::Dame,
                    };
                    for region_point in region {
                        status.insert(region_point, verdict);
                    }
                }
            }
        }

        Territory { status }
    }

    pub fn stones(&self, player: Player) -> usize {
        self.count(PointStatus::Stone(player))
    }

    pub fn territory(&self, player: Player) -> usize {
        self.count(PointStatus::Territory(player))
    }

    pub fn dame(&self) -> usize {
        self.count(PointStatus::Dame)
    }

    fn count(&self, wanted: PointStatus) -> usize {
        self.status.values().filter(|&&s| s == wanted).count()
    }
}

/// Walk an empty region from a starting point, collecting the region and
/// the colors of the stones it touches.
fn explore_region(board: &Board, start: Point) -> (Vec<Point>, HashSet<Player>) {
    let mut region = Vec::new();
    let mut borders = HashSet::new();
    let mut visited = HashSet::new();
    let mut frontier = vec![start];

    while let Some(point) = frontier.pop() {
        if !visited.insert(point) {
            continue;
        }
        region.push(point);

        for &neighbor in board.topology().neighbors(point) {
            match board.player_at(neighbor) {
                Some(player) => {
                    borders.insert(player);
                }
                None => frontier.push(neighbor),
            }
        }
    }

    (region, borders)
}

/// An area-scored result: stones plus territory per side, komi to White.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GameResult {
    pub black: usize,
    pub white: usize,
    pub komi: f32,
}

impl GameResult {
    pub fn winner(&self) -> Option<Player> {
        let margin = self.winning_margin();
        if margin > 0.0 {
            Some(Player::Black)
        } else if margin < 0.0 {
            Some(Player::White)
        } else {
            None
        }
    }

    /// Black's score minus White's, positive when Black leads.
    pub fn winning_margin(&self) -> f32 {
        self.black as f32 - (self.white as f32 + self.komi)
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let margin = self.winning_margin();
        match self.winner() {
            Some(Player::Black) => write!(f, "B+{margin}"),
            Some(Player::White) => write!(f, "W+{}", -margin),
            None => write!(f, "draw"),
        }
    }
}

/// Score a position with the komi from its rules.
pub fn compute_result(state: &GameState) -> GameResult {
    let territory = Territory::evaluate(state.board());
    GameResult {
        black: territory.stones(Player::Black) + territory.territory(Player::Black),
        white: territory.stones(Player::White) + territory.territory(Player::White),
        komi: state.rules().komi,
    }
}
