/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! One process's run of the grid sort.

use std::time::Duration;

use gridcomm::Communicator;
use gridslice::FanInTree;
use gridslice::Grid;
use tokio::time::Instant;
use tracing::Instrument;

use crate::Comparison;
use crate::Element;
use crate::KeyedData;
use crate::RankVector;
use crate::SortConfig;
use crate::SortError;
use crate::broadcast::row_broadcast;
use crate::gossip::column_gossip;
use crate::order::order_by_rank;
use crate::rank::local_rank;
use crate::reduce::two_level_reduce;

/// Wall time spent in each stage by one process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub gossip: Duration,
    pub broadcast: Duration,
    /// Includes the barrier preceding rank computation.
    pub rank: Duration,
    pub reduce: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.gossip + self.broadcast + self.rank + self.reduce
    }
}

/// What every process knows when the sort completes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report<T> {
    pub rank: usize,
    /// The process's column data, concatenated in origin order.
    pub column_data: Vec<T>,
    /// The data shared by the process's row.
    pub row_shared: Vec<T>,
    /// The process's rank counts for `row_shared`.
    pub local_ranks: RankVector,
    pub timings: StageTimings,
}

/// The root's result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootResult<T> {
    /// Row shared data of every row, in row order.
    pub concatenated: Vec<T>,
    /// `global_ranks[i]` is the rank of `concatenated[i]` over the whole
    /// input.
    pub global_ranks: RankVector,
    pub sorted: Vec<T>,
}

/// The result of [`GridProcess::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Root {
        report: Report<T>,
        result: RootResult<T>,
    },
    Member(Report<T>),
}

impl<T> Outcome<T> {
    pub fn report(&self) -> &Report<T> {
        match self {
            Outcome::Root { report, .. } | Outcome::Member(report) => report,
        }
    }

    pub fn root(&self) -> Option<&RootResult<T>> {
        match self {
            Outcome::Root { result, .. } => Some(result),
            Outcome::Member(_) => None,
        }
    }
}

/// A process of the grid, owning its endpoint and the grid's shape.
#[derive(Debug)]
pub struct GridProcess<C> {
    comm: C,
    grid: Grid,
    tree: FanInTree,
    comparison: Comparison,
}

impl<C: Communicator> GridProcess<C> {
    /// Validate `comm`'s world against the configured grid. Fails
    /// before any communication if the world is not `side * side`.
    pub fn new(comm: C, config: &SortConfig) -> Result<Self, SortError> {
        let grid = Grid::for_world(config.grid_side, comm.size())?;
        grid.check_rank(comm.rank())?;
        let tree = FanInTree::square(&grid)?;
        Ok(Self {
            comm,
            grid,
            tree,
            comparison: config.comparison,
        })
    }

    /// Run all four stages on this process's `fragment`.
    pub async fn run<T: Element>(&mut self, fragment: Vec<T>) -> Result<Outcome<T>, SortError> {
        let rank = self.comm.rank();
        let point = self.grid.point(rank)?;
        let span = tracing::info_span!("grid_sort", rank, row = point.row, col = point.col);
        self.run_stages(fragment).instrument(span).await
    }

    async fn run_stages<T: Element>(&mut self, fragment: Vec<T>) -> Result<Outcome<T>, SortError> {
        let rank = self.comm.rank();
        let mut timings = StageTimings::default();
        tracing::debug!(len = fragment.len(), "starting with fragment {:?}", fragment);

        let start = Instant::now();
        let mut column = KeyedData::singleton(rank, fragment);
        column_gossip(&mut self.comm, &self.grid, &mut column).await?;
        let column_data = column.concat();
        timings.gossip = start.elapsed();

        let start = Instant::now();
        let row_shared = row_broadcast(&mut self.comm, &self.grid, &column_data).await?;
        timings.broadcast = start.elapsed();

        // Rows must have settled everywhere before anyone ranks.
        let start = Instant::now();
        if self.grid.size() > 1 {
            self.comm.barrier().await?;
        }
        let local_ranks = local_rank(&column_data, &row_shared, self.comparison);
        timings.rank = start.elapsed();

        let start = Instant::now();
        let reduced = two_level_reduce(
            &mut self.comm,
            &self.tree,
            local_ranks.clone(),
            row_shared.clone(),
        )
        .await?;
        let result = match reduced {
            Some(rows) => {
                let (global_ranks, concatenated) = rows.into_parts();
                let sorted = order_by_rank(&global_ranks, &concatenated)?;
                Some(RootResult {
                    concatenated,
                    global_ranks,
                    sorted,
                })
            }
            None => None,
        };
        timings.reduce = start.elapsed();

        tracing::info!(
            gossip = ?timings.gossip,
            broadcast = ?timings.broadcast,
            rank_stage = ?timings.rank,
            reduce = ?timings.reduce,
            "grid sort complete"
        );
        let report = Report {
            rank,
            column_data,
            row_shared,
            local_ranks,
            timings,
        };
        Ok(match result {
            Some(result) => Outcome::Root { report, result },
            None => Outcome::Member(report),
        })
    }
}

#[cfg(test)]
mod tests {
    use gridcomm::Config;
    use gridcomm::LocalWorld;
    use tracing_test::traced_test;

    use super::*;

    #[tokio::test]
    async fn test_world_must_match_grid() {
        let comm = LocalWorld::new(8, &Config::new()).into_comms().remove(0);
        let err = GridProcess::new(comm, &SortConfig::new(3)).unwrap_err();
        assert!(matches!(
            err,
            SortError::Grid(gridslice::GridError::WorldSizeMismatch {
                side: 3,
                expected: 9,
                got: 8
            })
        ));
    }

    #[tokio::test]
    async fn test_single_process_sorts_locally() {
        let comm = LocalWorld::new(1, &Config::new()).into_comms().remove(0);
        let mut process = GridProcess::new(comm, &SortConfig::new(1)).unwrap();
        let fragment = vec!['q', 'a', 'q', 'b'];
        let outcome = process.run(fragment.clone()).await.unwrap();

        let report = outcome.report();
        assert_eq!(report.column_data, fragment);
        assert_eq!(report.row_shared, fragment);
        assert_eq!(
            report.local_ranks,
            local_rank(&fragment, &fragment, Comparison::AtMost)
        );
        let root = outcome.root().unwrap();
        assert_eq!(root.global_ranks, report.local_ranks);
        assert_eq!(root.sorted, vec!['a', 'b', 'q', 'q']);
    }

    #[traced_test]
    #[tokio::test]
    async fn test_logs_stage_timings() {
        let comm = LocalWorld::new(1, &Config::new()).into_comms().remove(0);
        let mut process = GridProcess::new(comm, &SortConfig::new(1)).unwrap();
        process.run(vec![3u8, 1, 2]).await.unwrap();
        assert!(logs_contain("grid sort complete"));
        assert!(logs_contain("reduce="));
    }

    #[tokio::test]
    async fn test_outcome_accessors() {
        let report = Report {
            rank: 3,
            column_data: vec![1],
            row_shared: vec![1],
            local_ranks: vec![1],
            timings: StageTimings::default(),
        };
        let member = Outcome::Member(report.clone());
        assert!(member.root().is_none());
        assert_eq!(member.report().rank, 3);
    }
}
