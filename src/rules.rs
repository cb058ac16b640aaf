//! Game rules and immutable game states.
//!
//! [`Rules`] is a plain data descriptor: which moves are allowed, which
//! placements are forbidden, an optional capture target that ends the game
//! early, and the komi used at scoring time. Standard Go and capture Go are
//! just two values of the same type.
//!
//! [`GameState`] is a snapshot. Applying a move builds a new state and leaves
//! the old one untouched, so search trees can hold on to any number of
//! historical positions without copying boards defensively.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::board::{Board, Move, Player, Point};

/// Komi applied when no explicit value is configured.
pub const DEFAULT_KOMI: f32 = 7.5;

/// A rule set, as data.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rules {
    pub pass_allowed: bool,
    pub resign_allowed: bool,
    pub suicide_forbidden: bool,
    pub ko_forbidden: bool,
    /// When set, the first player to capture this many stones wins.
    pub capture_target: Option<u32>,
    pub komi: f32,
}

impl Rules {
    /// Standard Go: passing and resigning allowed, suicide and ko forbidden,
    /// scored by territory with the default komi.
    pub fn general() -> Rules {
        Rules {
            pass_allowed: true,
            resign_allowed: true,
            suicide_forbidden: true,
            ko_forbidden: true,
            capture_target: None,
            komi: DEFAULT_KOMI,
        }
    }

    /// Capture Go: no passing or resigning, and the first capture of
    /// `target` stones wins outright. The suicide and ko checks are both
    /// disabled; a self-capture simply hands the opponent stones.
    pub fn capture(target: u32) -> Rules {
        Rules {
            pass_allowed: false,
            resign_allowed: false,
            suicide_forbidden: false,
            ko_forbidden: false,
            capture_target: Some(target),
            komi: 0.0,
        }
    }

    pub fn with_komi(self, komi: f32) -> Rules {
        Rules { komi, ..self }
    }
}

impl Default for Rules {
    fn default() -> Rules {
        Rules::general()
    }
}

/// A move rejected by the rules. Structural faults (off-grid, occupied
/// point) panic in [`Board`] instead; these are the recoverable cases a
/// caller is expected to handle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("pass is not allowed")]
    PassNotAllowed,
    #[error("resign is not allowed")]
    ResignNotAllowed,
    #[error("point is outside of the grid")]
    OutsideGrid,
    #[error("this place is already taken by another stone")]
    PointTaken,
    #[error("point is a suicide move")]
    Suicide,
    #[error("point violates the ko rule")]
    Ko,
}

/// One position in a game, with enough history for rule checks.
#[derive(Clone, Debug)]
pub struct GameState {
    board: Board,
    previous_board: Option<Board>,
    next_player: Player,
    last_move: Option<Move>,
    previous_move: Option<Move>,
    rules: Rules,
}

impl GameState {
    /// An empty board with Black to move.
    pub fn new_game(board_size: usize, rules: Rules) -> GameState {
        GameState::from_board(Board::new(board_size), Player::Black, rules)
    }

    /// Adopt an existing position, e.g. one set up by hand in a test.
    pub fn from_board(board: Board, next_player: Player, rules: Rules) -> GameState {
        GameState {
            board,
            previous_board: None,
            next_player,
            last_move: None,
            previous_move: None,
            rules,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn next_player(&self) -> Player {
        self.next_player
    }

    pub fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Apply a pre-validated move, producing the successor state.
    ///
    /// Skipping validation is what makes playouts cheap; callers that take
    /// untrusted input go through [`GameState::play`] instead.
    pub fn apply_move(&self, mv: Move) -> GameState {
        let mut board = self.board.clone();
        if let Move::Play(point) = mv {
            board.place_stone(self.next_player, point);
        }

        GameState {
            board,
            previous_board: Some(self.board.clone()),
            next_player: self.next_player.other(),
            last_move: Some(mv),
            previous_move: self.last_move,
            rules: self.rules,
        }
    }

    /// Validate and apply a move.
    pub fn play(&self, mv: Move) -> Result<GameState, RuleViolation> {
        self.validate_move(mv)?;
        Ok(self.apply_move(mv))
    }

    pub fn is_valid_move(&self, mv: Move) -> bool {
        self.validate_move(mv).is_ok()
    }

    pub fn validate_move(&self, mv: Move) -> Result<(), RuleViolation> {
        match mv {
            Move::Pass if !self.rules.pass_allowed => Err(RuleViolation::PassNotAllowed),
            Move::Resign if !self.rules.resign_allowed => Err(RuleViolation::ResignNotAllowed),
            Move::Pass | Move::Resign => Ok(()),
            Move::Play(point) => self.validate_point(point),
        }
    }

    fn validate_point(&self, point: Point) -> Result<(), RuleViolation> {
        if self.board.is_outside_grid(point) {
            return Err(RuleViolation::OutsideGrid);
        }
        if self.board.is_point_taken(point) {
            return Err(RuleViolation::PointTaken);
        }
        if self.rules.suicide_forbidden && self.is_suicide(point) {
            return Err(RuleViolation::Suicide);
        }
        if self.rules.ko_forbidden && self.violates_ko(point) {
            return Err(RuleViolation::Ko);
        }
        Ok(())
    }

    /// A placement is suicide when the placed chain ends up with no
    /// liberties. The probe board resolves enemy captures first, so a move
    /// that captures is never reported as suicide.
    fn is_suicide(&self, point: Point) -> bool {
        let mut probe = self.board.clone();
        probe.place_stone(self.next_player, point);
        probe.player_at(point).is_none()
    }

    /// Single-ply ko: the move is illegal when it would recreate the
    /// position as it stood before the opponent's last move. Longer
    /// repetition cycles (superko) are not detected.
    fn violates_ko(&self, point: Point) -> bool {
        let Some(previous_board) = &self.previous_board else {
            return false;
        };

        let mut probe = self.board.clone();
        probe.place_stone(self.next_player, point);
        probe == *previous_board
    }

    /// Whether the game has ended.
    ///
    /// Resignation ends the game, two consecutive passes end it, and under
    /// capture rules reaching the target number of captured stones ends it
    /// regardless of what was played last.
    pub fn is_over(&self) -> bool {
        if let Some(target) = self.rules.capture_target {
            if self.board.captured_stones(Player::Black) >= target
                || self.board.captured_stones(Player::White) >= target
            {
                return true;
            }
        }

        match self.last_move {
            Some(Move::Resign) => true,
            Some(Move::Pass) => {
                self.rules.pass_allowed && self.previous_move == Some(Move::Pass)
            }
            _ => false,
        }
    }

    /// The winner of a finished game, or `None` for a game still in progress
    /// or a drawn result. Double-pass endings are settled by territory.
    pub fn winner(&self) -> Option<Player> {
        if !self.is_over() {
            return None;
        }

        if self.last_move == Some(Move::Resign) {
            return Some(self.next_player);
        }

        if let Some(target) = self.rules.capture_target {
            if self.board.captured_stones(Player::Black) >= target {
                return Some(Player::Black);
            }
            if self.board.captured_stones(Player::White) >= target {
                return Some(Player::White);
            }
        }

        crate::scoring::compute_result(self).winner()
    }

    /// All legal moves for the next player, in grid order. Resignation is
    /// never offered here. When no placement is legal and passing is
    /// allowed, the single pass move is returned so a game can always run
    /// to completion.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves: Vec<Move> = self
            .board
            .topology()
            .points()
            .iter()
            .filter(|&&point| self.validate_point(point).is_ok())
            .map(|&point| Move::Play(point))
            .collect();

        // Passing is always on offer when legal, which doubles as the
        // fallback on a position with no playable point.
        if self.rules.pass_allowed {
            moves.push(Move::Pass);
        }
        moves
    }

    pub fn topology(&self) -> &Arc<crate::topology::Topology> {
        self.board.topology()
    }

    pub fn describe_last_move(&self) -> String {
        let mover = self.next_player.other();
        match self.last_move {
            Some(mv) => format!("{mover} played {}", mv.to_a1(self.board.size())),
            None => "no move played yet".to_string(),
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.board)?;
        write!(f, "next player: {}", self.next_player)
    }
}
