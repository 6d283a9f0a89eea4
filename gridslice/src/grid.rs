/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::Slice;
use crate::SliceError;

/// Errors that can occur while building or querying a [`Grid`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GridError {
    #[error("grid side must be at least 1")]
    EmptyGrid,

    #[error("grid {side}x{side} requires {expected} processes, got {got}")]
    WorldSizeMismatch {
        side: usize,
        expected: usize,
        got: usize,
    },

    #[error("grid side {side} is too large: side * side overflows")]
    TooLarge { side: usize },

    #[error("rank {rank} out of range for grid of {size} processes")]
    RankOutOfRange { rank: usize, size: usize },

    #[error("point ({row}, {col}) out of range for grid side {side}")]
    PointOutOfRange { row: usize, col: usize, side: usize },

    #[error("invalid fan-in tree: {reason}")]
    InvalidTree { reason: String },

    #[error(transparent)]
    SliceError(#[from] SliceError),
}

/// A (row, column) position in a [`Grid`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    /// Whether this point lies on the main diagonal.
    pub fn is_diagonal(&self) -> bool {
        self.row == self.col
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A square process grid of side `G`, laid out in row-major order over
/// ranks `0..G*G`.
///
/// Every process must build its grid with the same side; construct it
/// with [`Grid::for_world`] so that a mismatch with the world size is
/// reported before any communication takes place.
///
/// ```
/// # use gridslice::Grid;
/// let grid = Grid::for_world(3, 9).unwrap();
/// assert_eq!(grid.point(5).unwrap().row, 1);
/// assert_eq!(grid.down(7), 1);
/// assert!(grid.diagonal().iter().eq([0, 4, 8]));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    side: usize,
    slice: Slice,
}

impl Grid {
    /// A grid of the given side.
    pub fn new(side: usize) -> Result<Self, GridError> {
        if side == 0 {
            return Err(GridError::EmptyGrid);
        }
        if side.checked_mul(side).is_none() {
            return Err(GridError::TooLarge { side });
        }
        Ok(Self {
            side,
            slice: Slice::new_row_major([side, side]),
        })
    }

    /// A grid of the given side, validated against the number of
    /// processes in the world.
    pub fn for_world(side: usize, world_size: usize) -> Result<Self, GridError> {
        let grid = Self::new(side)?;
        if grid.size() != world_size {
            return Err(GridError::WorldSizeMismatch {
                side,
                expected: grid.size(),
                got: world_size,
            });
        }
        Ok(grid)
    }

    /// The number of rows (and columns).
    pub fn side(&self) -> usize {
        self.side
    }

    /// The number of processes, `side * side`. Construction guarantees
    /// the product fits.
    pub fn size(&self) -> usize {
        self.side * self.side
    }

    /// The underlying row-major slice.
    pub fn slice(&self) -> &Slice {
        &self.slice
    }

    /// All ranks in the grid.
    pub fn ranks(&self) -> std::ops::Range<usize> {
        0..self.size()
    }

    /// The rank that terminates every fan-in.
    pub fn root(&self) -> usize {
        0
    }

    pub fn row(&self, rank: usize) -> usize {
        rank / self.side
    }

    pub fn col(&self, rank: usize) -> usize {
        rank % self.side
    }

    /// The point of `rank`, validated against the grid size.
    pub fn point(&self, rank: usize) -> Result<Point, GridError> {
        self.check_rank(rank)?;
        Ok(Point {
            row: self.row(rank),
            col: self.col(rank),
        })
    }

    /// The rank at `point`.
    pub fn rank_of(&self, point: Point) -> Result<usize, GridError> {
        self.slice
            .location(&[point.row, point.col])
            .map_err(|_| GridError::PointOutOfRange {
                row: point.row,
                col: point.col,
                side: self.side,
            })
    }

    pub fn check_rank(&self, rank: usize) -> Result<(), GridError> {
        if rank >= self.size() {
            return Err(GridError::RankOutOfRange {
                rank,
                size: self.size(),
            });
        }
        Ok(())
    }

    /// The rank below `rank` in its column, wrapping around.
    pub fn down(&self, rank: usize) -> usize {
        ((self.row(rank) + 1) % self.side) * self.side + self.col(rank)
    }

    /// The rank above `rank` in its column, wrapping around.
    pub fn up(&self, rank: usize) -> usize {
        ((self.row(rank) + self.side - 1) % self.side) * self.side + self.col(rank)
    }

    pub fn is_diagonal(&self, rank: usize) -> bool {
        self.row(rank) == self.col(rank)
    }

    /// The diagonal rank of row `row`.
    pub fn diagonal_of_row(&self, row: usize) -> usize {
        row * self.side + row
    }

    /// The ranks of row `row`.
    pub fn row_slice(&self, row: usize) -> Result<Slice, GridError> {
        Ok(self.slice.at(0, row)?)
    }

    /// The ranks of column `col`.
    pub fn column_slice(&self, col: usize) -> Result<Slice, GridError> {
        Ok(self.slice.at(1, col)?)
    }

    /// The main diagonal, in row order.
    pub fn diagonal(&self) -> Slice {
        Slice::new_strided(0, self.side, self.side + 1)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid {}x{}", self.side, self.side)
    }
}
