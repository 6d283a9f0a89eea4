/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Planning and running a whole grid in process.

use gridcomm::Communicator;
use gridcomm::Frame;
use gridcomm::LocalWorld;
use gridslice::Grid;

use crate::Element;
use crate::GridProcess;
use crate::Outcome;
use crate::RootResult;
use crate::SortConfig;
use crate::SortError;
use crate::gossip::GossipMessage;
use crate::partition;
use crate::reduce::RankedRows;

/// The static shape of a run, checked before any process starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    grid: Grid,
    fragment_len: usize,
    max_payload_len: usize,
}

impl Plan {
    /// Plan a sort of `input_len` elements. Fails if the input cannot be
    /// split evenly across the grid.
    pub fn new(config: &SortConfig, input_len: usize) -> Result<Self, SortError> {
        let grid = Grid::new(config.grid_side)?;
        let fragment_len = partition::fragment_len(input_len, grid.size())?;
        Ok(Self {
            grid,
            fragment_len,
            max_payload_len: config.comm.max_payload_len(),
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn fragment_len(&self) -> usize {
        self.fragment_len
    }

    /// Check that the largest message of a sort of `input` fits in a
    /// frame. Messages are sized as if every element were as wide as
    /// the widest element of `input`.
    pub fn validate<T: Element>(&self, input: &[T]) -> Result<(), SortError> {
        let needed = self.largest_message(input)?;
        if needed > self.max_payload_len {
            return Err(SortError::PayloadBound {
                needed,
                max: self.max_payload_len,
            });
        }
        Ok(())
    }

    fn largest_message<T: Element>(&self, input: &[T]) -> Result<usize, SortError> {
        let mut widest = None;
        let mut width = 0;
        for element in input {
            let len = Frame::encoded_len(element)?;
            if widest.is_none() || len > width {
                widest = Some(element);
                width = len;
            }
        }
        let Some(widest) = widest else {
            return Ok(0);
        };

        let side = self.grid.side();
        let fragment = vec![widest.clone(); self.fragment_len];
        let column = vec![widest.clone(); self.fragment_len * side];
        // The last gossip round carries all but one of a column's
        // fragments; the broadcast carries all of them; the diagonals
        // send their row's ranks along with its data.
        let gossip = GossipMessage {
            round: side.saturating_sub(1),
            entries: vec![(0, fragment); side.saturating_sub(1)],
        };
        let rows = RankedRows::new(vec![0; column.len()], column.clone())?;
        let ranks = vec![0u64; column.len()];
        Ok([
            Frame::encoded_len(&gossip)?,
            Frame::encoded_len(&column)?,
            Frame::encoded_len(&ranks)?,
            Frame::encoded_len(&rows)?,
        ]
        .into_iter()
        .max()
        .unwrap_or_default())
    }
}

/// The outcomes of every process of a local run, in rank order.
#[derive(Debug)]
pub struct LocalRun<T> {
    pub outcomes: Vec<Outcome<T>>,
}

impl<T> LocalRun<T> {
    /// The root's result.
    pub fn root(&self) -> Option<&RootResult<T>> {
        self.outcomes.iter().find_map(Outcome::root)
    }

    pub fn sorted(&self) -> Option<&[T]> {
        self.root().map(|root| root.sorted.as_slice())
    }
}

/// Sort `input` on a grid of in-process tasks.
///
/// The run is planned and validated first, so configuration and payload
/// errors are reported before any process starts. If processes fail,
/// the first error that is not a stall is returned: stalls are usually
/// consequences of a failure elsewhere.
pub async fn sort_local<T: Element>(
    config: &SortConfig,
    input: &[T],
) -> Result<LocalRun<T>, SortError> {
    let plan = Plan::new(config, input.len())?;
    plan.validate(input)?;
    let mut fragments = partition::scatter(input, plan.grid().size())?;
    tracing::info!(
        grid = %plan.grid(),
        len = input.len(),
        fragment_len = plan.fragment_len(),
        "starting local grid sort"
    );

    let results = LocalWorld::new(plan.grid().size(), &config.comm)
        .run(|comm| {
            let fragment = std::mem::take(&mut fragments[comm.rank()]);
            let config = config.clone();
            async move {
                let mut process = GridProcess::new(comm, &config)?;
                process.run(fragment).await
            }
        })
        .await?;

    let mut outcomes = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => errors.push(err),
        }
    }
    if !errors.is_empty() {
        let first = errors
            .iter()
            .position(|err| !err.is_stall())
            .unwrap_or_default();
        return Err(errors.swap_remove(first));
    }
    Ok(LocalRun { outcomes })
}
