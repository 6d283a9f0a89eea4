/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Square process-grid topology.
//!
//! Provides [`Slice`], a compact strided view over process ranks, and
//! [`Grid`], the square row-major arrangement of ranks that the grid
//! sort runs on. Rows, columns and the main diagonal of a grid are all
//! slices. [`FanInTree`] describes hierarchical reductions over a grid
//! as data rather than index arithmetic.
//!
//! The crate is pure arithmetic: it performs no communication.

mod slice;
pub use slice::Slice;
pub use slice::SliceError;
pub use slice::SliceIterator;

mod grid;
pub use grid::Grid;
pub use grid::GridError;
pub use grid::Point;

/// Hierarchical reduction trees over a grid.
pub mod tree;
pub use tree::FanInGroup;
pub use tree::FanInStage;
pub use tree::FanInTree;
