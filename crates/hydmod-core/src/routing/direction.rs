//! Compass directions of the 8-connected grid.
//!
//! Canonical order is E, SE, S, SW, W, NW, N, NE; every per-direction array
//! in the crate is indexed by `Direction as usize`.  South is increasing row.
use serde::{Deserialize, Serialize};

use crate::grid::Grid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    E = 0,
    SE = 1,
    S = 2,
    SW = 3,
    W = 4,
    NW = 5,
    N = 6,
    NE = 7,
}

/// (row, col) offsets in canonical order.
pub const D8_OFFSETS: [(isize, isize); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
        Direction::N,
        Direction::NE,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn offset(self) -> (isize, isize) {
        D8_OFFSETS[self.index()]
    }

    /// The direction pointing back at this one.
    #[inline]
    pub fn opposite(self) -> Direction {
        Self::ALL[(self.index() + 4) % 8]
    }

    #[inline]
    pub fn is_diagonal(self) -> bool {
        self.index() % 2 == 1
    }

    /// Centre-to-centre distance to the neighbour in this direction.
    #[inline]
    pub fn distance(self, grid: &Grid) -> f64 {
        match self {
            Direction::E | Direction::W => grid.dx,
            Direction::N | Direction::S => grid.dy,
            _ => grid.dx.hypot(grid.dy),
        }
    }
}
