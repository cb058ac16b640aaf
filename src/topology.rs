//! Per-size board topology: adjacency tables and Zobrist hash constants.
//!
//! A [`Topology`] is built once per board size and shared by reference
//! (`Arc`) between every board of that size. The Zobrist tables are derived
//! from a seed that depends only on the size, so two boards that never shared
//! a topology instance still hash equal stone sets to equal values.

use std::sync::Arc;

use crate::board::{Player, Point};

/// Base seed for the per-size Zobrist tables.
const ZOBRIST_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Precomputed geometry and hash constants for one board size.
#[derive(Debug)]
pub struct Topology {
    size: usize,
    points: Vec<Point>,
    neighbors: Vec<Vec<Point>>,
    corners: Vec<Vec<Point>>,
    zobrist: Vec<[u64; 2]>,
}

impl Topology {
    pub fn new(size: usize) -> Topology {
        assert!(size > 0, "board size must be positive");
        // The A1 coordinate alphabet caps the board width.
        assert!(
            size <= crate::board::COLUMN_NAMES.len(),
            "board size is limited to {} columns",
            crate::board::COLUMN_NAMES.len()
        );

        let mut rng = fastrand::Rng::with_seed(ZOBRIST_SEED ^ size as u64);

        let mut points = Vec::with_capacity(size * size);
        let mut neighbors = Vec::with_capacity(size * size);
        let mut corners = Vec::with_capacity(size * size);
        let mut zobrist = Vec::with_capacity(size * size);

        for row in 0..size {
            for col in 0..size {
                points.push(Point::new(row, col));
                neighbors.push(in_grid_neighbors(row, col, size));
                corners.push(in_grid_corners(row, col, size));
                zobrist.push([rng.u64(..), rng.u64(..)]);
            }
        }

        Topology {
            size,
            points,
            neighbors,
            corners,
            zobrist,
        }
    }

    pub fn shared(size: usize) -> Arc<Topology> {
        Arc::new(Topology::new(size))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Every point of the grid, in row-major order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// In-grid orthogonal neighbors of a point (2 to 4 of them).
    pub fn neighbors(&self, point: Point) -> &[Point] {
        &self.neighbors[self.index_of(point)]
    }

    /// In-grid diagonal corners of a point (1 to 4 of them).
    pub fn corners(&self, point: Point) -> &[Point] {
        &self.corners[self.index_of(point)]
    }

    /// The hash constant toggled when `player` places or loses a stone at
    /// `point`.
    pub fn zobrist(&self, player: Player, point: Point) -> u64 {
        self.zobrist[self.index_of(point)][player.index()]
    }

    /// Row-major index of a point. External encoders that map a state to a
    /// feature tensor use this same ordering when decoding oracle output.
    pub fn index_of(&self, point: Point) -> usize {
        point.row * self.size + point.col
    }

    /// Inverse of [`Topology::index_of`].
    pub fn point_at(&self, index: usize) -> Point {
        Point::new(index / self.size, index % self.size)
    }
}

fn in_grid_neighbors(row: usize, col: usize, size: usize) -> Vec<Point> {
    let mut neighbors = Vec::with_capacity(4);
    if col > 0 {
        neighbors.push(Point::new(row, col - 1));
    }
    if col + 1 < size {
        neighbors.push(Point::new(row, col + 1));
    }
    if row > 0 {
        neighbors.push(Point::new(row - 1, col));
    }
    if row + 1 < size {
        neighbors.push(Point::new(row + 1, col));
    }
    neighbors
}

fn in_grid_corners(row: usize, col: usize, size: usize) -> Vec<Point> {
    let mut corners = Vec::with_capacity(4);
    if row > 0 && col > 0 {
        corners.push(Point::new(row - 1, col - 1));
    }
    if row > 0 && col + 1 < size {
        corners.push(Point::new(row - 1, col + 1));
    }
    if row + 1 < size && col + 1 < size {
        corners.push(Point::new(row + 1, col + 1));
    }
    if row + 1 < size && col > 0 {
        corners.push(Point::new(row + 1, col - 1));
    }
    corners
}
