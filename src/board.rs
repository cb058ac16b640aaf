//! Board state, chains of stones, and capture mechanics.
//!
//! A [`Board`] maps occupied points to immutable [`Chain`] values shared by
//! `Arc`. Placing a stone partitions its neighbors into new liberties, own
//! chains to merge with, and enemy chains that lose a liberty; enemy chains
//! reduced to zero liberties are captured before the placed chain is checked
//! for self-capture, so a capturing move is never mistaken for suicide.
//!
//! The board keeps an incremental 64-bit Zobrist hash: every occupied
//! (player, point) pair XOR-toggles a fixed constant, so boards with the same
//! stones hash equal no matter the order they were placed in.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::topology::Topology;

/// Column letters for A1 coordinates. 'I' is skipped by Go convention.
pub(crate) const COLUMN_NAMES: &[u8] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    Black,
    White,
}

impl Player {
    pub fn other(self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Player::Black => 0,
            Player::White => 1,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Player::Black => 'x',
            Player::White => 'o',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Black => write!(f, "Black"),
            Player::White => write!(f, "White"),
        }
    }
}

/// A grid coordinate. Row 0 is the top row as printed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(row: usize, col: usize) -> Point {
        Point { row, col }
    }

    /// Parse an A1-style coordinate such as "D4". Columns count from 'A'
    /// (skipping 'I'), rows from the bottom of the printed board.
    pub fn from_a1(coordinates: &str, board_size: usize) -> Option<Point> {
        let coordinates = coordinates.trim();
        if coordinates.len() < 2 {
            return None;
        }

        let column_char = coordinates.as_bytes()[0].to_ascii_uppercase();
        let col = COLUMN_NAMES[..board_size.min(COLUMN_NAMES.len())]
            .iter()
            .position(|&c| c == column_char)?;

        let number: usize = coordinates[1..].parse().ok()?;
        if number == 0 || number > board_size {
            return None;
        }

        Some(Point::new(board_size - number, col))
    }

    pub fn to_a1(self, board_size: usize) -> String {
        format!("{}{}", COLUMN_NAMES[self.col] as char, board_size - self.row)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row: {}, Column: {}", self.row, self.col)
    }
}

/// A move is exactly one of: a stone placed at a point, a pass, or a
/// resignation. The enum makes any other combination unrepresentable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Play(Point),
    Pass,
    Resign,
}

impl Move {
    pub fn is_play(self) -> bool {
        matches!(self, Move::Play(_))
    }

    pub fn is_pass(self) -> bool {
        matches!(self, Move::Pass)
    }

    pub fn is_resign(self) -> bool {
        matches!(self, Move::Resign)
    }

    pub fn is_pass_or_resign(self) -> bool {
        !self.is_play()
    }

    /// Parse "pass", "resign", or an A1 coordinate.
    pub fn from_a1(input: &str, board_size: usize) -> Option<Move> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("pass") {
            return Some(Move::Pass);
        }
        if input.eq_ignore_ascii_case("resign") {
            return Some(Move::Resign);
        }
        Point::from_a1(input, board_size).map(Move::Play)
    }

    pub fn to_a1(self, board_size: usize) -> String {
        match self {
            Move::Play(point) => point.to_a1(board_size),
            Move::Pass => "PASS".to_string(),
            Move::Resign => "RESIGN".to_string(),
        }
    }
}

/// A maximal group of connected same-color stones together with its
/// liberties. Chains are immutable; every update builds a new value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chain {
    pub player: Player,
    pub stones: HashSet<Point>,
    pub liberties: HashSet<Point>,
}

impl Chain {
    pub fn new(
        player: Player,
        stones: impl IntoIterator<Item = Point>,
        liberties: impl IntoIterator<Item = Point>,
    ) -> Chain {
        Chain {
            player,
            stones: stones.into_iter().collect(),
            liberties: liberties.into_iter().collect(),
        }
    }

    pub fn with_liberty(&self, liberty: Point) -> Chain {
        let mut liberties = self.liberties.clone();
        liberties.insert(liberty);
        Chain {
            player: self.player,
            stones: self.stones.clone(),
            liberties,
        }
    }

    pub fn without_liberty(&self, liberty: Point) -> Chain {
        let mut liberties = self.liberties.clone();
        liberties.remove(&liberty);
        Chain {
            player: self.player,
            stones: self.stones.clone(),
            liberties,
        }
    }

    /// Combine two chains of the same color. The merged liberty set is the
    /// union of both, minus all combined stones.
    ///
    /// # Panics
    /// Panics when the chains belong to different players.
    pub fn merge(&self, other: &Chain) -> Chain {
        assert_eq!(
            self.player, other.player,
            "can't merge chains of different color"
        );

        let stones: HashSet<Point> = self.stones.union(&other.stones).copied().collect();
        let liberties: HashSet<Point> = self
            .liberties
            .union(&other.liberties)
            .copied()
            .filter(|liberty| !stones.contains(liberty))
            .collect();

        Chain {
            player: self.player,
            stones,
            liberties,
        }
    }

    pub fn num_liberties(&self) -> usize {
        self.liberties.len()
    }
}

/// A mutable board position.
#[derive(Clone, Debug)]
pub struct Board {
    size: usize,
    grid: HashMap<Point, Arc<Chain>>,
    captured: [u32; 2],
    hash: u64,
    topology: Arc<Topology>,
}

impl Board {
    pub fn new(size: usize) -> Board {
        Board::with_topology(Topology::shared(size))
    }

    pub fn with_topology(topology: Arc<Topology>) -> Board {
        Board {
            size: topology.size(),
            grid: HashMap::new(),
            captured: [0, 0],
            hash: 0,
            topology,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Zobrist hash of the current stone set.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    pub fn stones(&self) -> impl Iterator<Item = Point> + '_ {
        self.grid.keys().copied()
    }

    /// Every distinct chain on the board.
    pub fn chains(&self) -> impl Iterator<Item = &Arc<Chain>> {
        let mut seen = HashSet::new();
        self.grid
            .values()
            .filter(move |chain| seen.insert(Arc::as_ptr(chain)))
    }

    pub fn is_on_grid(&self, point: Point) -> bool {
        point.row < self.size && point.col < self.size
    }

    pub fn is_outside_grid(&self, point: Point) -> bool {
        !self.is_on_grid(point)
    }

    pub fn is_point_taken(&self, point: Point) -> bool {
        self.grid.contains_key(&point)
    }

    pub fn is_point_empty(&self, point: Point) -> bool {
        !self.is_point_taken(point)
    }

    pub fn player_at(&self, point: Point) -> Option<Player> {
        self.grid.get(&point).map(|chain| chain.player)
    }

    pub fn get_chain(&self, point: Point) -> Option<&Arc<Chain>> {
        self.grid.get(&point)
    }

    pub fn captured_stones(&self, player: Player) -> u32 {
        self.captured[player.index()]
    }

    /// Place a stone and resolve captures.
    ///
    /// Rule legality (suicide, ko) is a concern of the layer above; this
    /// method only rejects structurally impossible placements.
    ///
    /// # Panics
    /// Panics when the point is off the grid or already occupied.
    pub fn place_stone(&mut self, player: Player, point: Point) {
        assert!(self.is_on_grid(point), "point is outside of the grid");
        assert!(
            self.is_point_empty(point),
            "point is already taken by another stone"
        );

        self.hash ^= self.topology.zobrist(player, point);

        let mut liberties = Vec::new();
        let mut own = Vec::new();
        let mut enemy = Vec::new();

        for &neighbor in self.topology.neighbors(point) {
            match self.grid.get(&neighbor) {
                None => liberties.push(neighbor),
                Some(chain) if chain.player == player => push_distinct(&mut own, chain),
                Some(chain) => push_distinct(&mut enemy, chain),
            }
        }

        let mut chain = Chain::new(player, [point], liberties);
        for own_chain in &own {
            chain = chain.merge(&own_chain.without_liberty(point));
        }
        self.insert_chain(Arc::new(chain));

        for enemy_chain in enemy {
            let shrunk = enemy_chain.without_liberty(point);
            if shrunk.liberties.is_empty() {
                self.remove_chain(&shrunk);
            } else {
                self.insert_chain(Arc::new(shrunk));
            }
        }

        // Enemy captures resolve first; only a chain that still has no
        // liberties afterwards is a self-capture, credited to the opponent.
        let placed = Arc::clone(&self.grid[&point]);
        if placed.liberties.is_empty() {
            self.remove_chain(&placed);
        }
    }

    /// An empty point is an eye for a player when every orthogonal neighbor
    /// is that player's stone and at least 3 of its diagonal corners are too
    /// (all of them, when the point has fewer than 4 corners).
    pub fn is_point_an_eye(&self, player: Player, point: Point) -> bool {
        if self.is_point_taken(point) {
            return false;
        }

        for &neighbor in self.topology.neighbors(point) {
            if self.player_at(neighbor) != Some(player) {
                return false;
            }
        }

        let corners = self.topology.corners(point);
        let friendly = corners
            .iter()
            .filter(|&&corner| self.player_at(corner) == Some(player))
            .count();

        friendly == corners.len() || friendly >= 3
    }

    fn insert_chain(&mut self, chain: Arc<Chain>) {
        for &stone in &chain.stones {
            self.grid.insert(stone, Arc::clone(&chain));
        }
    }

    fn remove_chain(&mut self, chain: &Chain) {
        let captor = chain.player.other();
        self.captured[captor.index()] += chain.stones.len() as u32;

        for &stone in &chain.stones {
            self.remove_stone(chain.player, stone);
        }
    }

    fn remove_stone(&mut self, player: Player, stone: Point) {
        let topology = Arc::clone(&self.topology);
        for &neighbor in topology.neighbors(stone) {
            // Surviving enemy chains regain the vacated point as a liberty.
            let restored = match self.grid.get(&neighbor) {
                Some(chain) if chain.player != player => Arc::new(chain.with_liberty(stone)),
                _ => continue,
            };
            self.insert_chain(restored);
        }

        self.grid.remove(&stone);
        self.hash ^= self.topology.zobrist(player, stone);
    }
}

/// Boards compare positionally, by Zobrist hash.
impl PartialEq for Board {
    fn eq(&self, other: &Board) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Board {}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in (1..=self.size).rev() {
            write!(f, "{label:>2}")?;
            let row = self.size - label;
            for col in 0..self.size {
                let symbol = match self.player_at(Point::new(row, col)) {
                    Some(player) => player.symbol(),
                    None => '.',
                };
                write!(f, " {symbol} ")?;
            }
            writeln!(f)?;
        }

        write!(f, "  ")?;
        for col in 0..self.size {
            write!(f, " {} ", COLUMN_NAMES[col] as char)?;
        }
        Ok(())
    }
}

fn push_distinct(chains: &mut Vec<Arc<Chain>>, chain: &Arc<Chain>) {
    if !chains.iter().any(|existing| Arc::ptr_eq(existing, chain)) {
        chains.push(Arc::clone(chain));
    }
}
