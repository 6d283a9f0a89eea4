/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! A distributed counting sort over a square grid of processes.
//!
//! Every process of a `G`x`G` grid starts with one equal-length fragment
//! of the input. The sort runs four stages:
//!
//! 1. [`gossip`]: `G-1` rounds of ring exchange within each column, after
//!    which every process holds its whole column's data.
//! 2. [`broadcast`]: each row's diagonal process sends its column data to
//!    the rest of its row, which becomes the row's shared data.
//! 3. [`rank`]: every process counts, for each element of its row's
//!    shared data, how many of its column elements are not greater.
//! 4. [`reduce`] and [`order`]: rank vectors are summed at each row's
//!    diagonal, the diagonals hand their sums and data to the root, and
//!    the root orders the elements by rank.
//!
//! [`GridProcess`] runs the stages for one process over any
//! [`gridcomm::Communicator`]; [`sort_local`] runs a whole grid in
//! process.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub mod broadcast;
pub mod config;
pub mod cost;
mod error;
pub mod gossip;
pub mod input;
mod keyed;
pub mod launch;
pub mod order;
pub mod partition;
pub mod process;
pub mod rank;
pub mod reduce;

pub use config::SortConfig;
pub use error::SortError;
pub use keyed::KeyedData;
pub use launch::LocalRun;
pub use launch::Plan;
pub use launch::sort_local;
pub use process::GridProcess;
pub use process::Outcome;
pub use process::Report;
pub use process::RootResult;
pub use process::StageTimings;
pub use rank::Comparison;
pub use rank::RankVector;

/// Values that can be sorted on a grid.
pub trait Element:
    Ord + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Element for T where
    T: Ord + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Message tags. Each stage uses its own tag so that a message can never
/// be consumed by the wrong stage.
pub mod tags {
    use gridcomm::Tag;

    pub const GOSSIP: Tag = Tag(1);
    pub const BROADCAST: Tag = Tag(2);
    pub const ROW_RANKS: Tag = Tag(3);
    pub const ROOT_RANKS: Tag = Tag(4);
}
