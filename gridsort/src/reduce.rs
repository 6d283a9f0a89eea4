/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Fan-in of rank vectors along a [`FanInTree`].

use std::marker::PhantomData;

use gridcomm::CommExt;
use gridcomm::Communicator;
use gridcomm::Tag;
use gridcomm::accum::CommReducer;
use gridcomm::accum::ElementwiseSum;
use gridcomm::accum::reduce_updates;
use gridslice::FanInGroup;
use gridslice::FanInTree;
use gridslice::GridError;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Element;
use crate::RankVector;
use crate::SortError;
use crate::tags;

/// Sums the rank vectors of a row.
pub type RankSum = ElementwiseSum<u64>;

/// Fold `value` into `group`'s coordinator.
///
/// Members other than the coordinator send their value and return
/// `None`. The coordinator receives one value from each of them and
/// reduces all values, its own included, in member order.
pub async fn fan_in<C, R>(
    comm: &mut C,
    group: &FanInGroup,
    tag: Tag,
    reducer: &R,
    value: R::Update,
) -> Result<Option<R::Update>, SortError>
where
    C: Communicator + ?Sized,
    R: CommReducer + Sync,
    R::Update: Serialize + DeserializeOwned + Send + Sync,
{
    let rank = comm.rank();
    if rank != group.coordinator() {
        comm.send_value(group.coordinator(), tag, &value).await?;
        return Ok(None);
    }

    let mut own = Some(value);
    let mut updates = Vec::with_capacity(group.members().len());
    for &member in group.members() {
        let update = if member == rank {
            own.take().ok_or_else(|| SortError::Protocol {
                rank,
                reason: format!("rank {rank} listed twice in its group"),
            })?
        } else {
            comm.recv_value(member, tag).await?
        };
        updates.push(update);
    }
    let reduced = reduce_updates(reducer, updates).map_err(|source| SortError::Reduce { rank, source })?;
    tracing::debug!(%tag, members = group.members().len(), "fan-in complete");
    Ok(Some(reduced))
}

/// A run of elements with one rank per element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedRows<T> {
    ranks: RankVector,
    data: Vec<T>,
}

impl<T> RankedRows<T> {
    pub fn new(ranks: RankVector, data: Vec<T>) -> Result<Self, SortError> {
        if ranks.len() != data.len() {
            return Err(SortError::Misaligned {
                ranks: ranks.len(),
                elements: data.len(),
            });
        }
        Ok(Self { ranks, data })
    }

    pub fn ranks(&self) -> &[u64] {
        &self.ranks
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_parts(self) -> (RankVector, Vec<T>) {
        (self.ranks, self.data)
    }
}

/// Appends rows in reduction order, keeping `ranks[i]` paired with
/// `data[i]`.
#[derive(Debug)]
pub struct RowConcat<T>(PhantomData<T>);

impl<T> Default for RowConcat<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> CommReducer for RowConcat<T> {
    type Update = RankedRows<T>;

    fn reduce(&self, mut left: RankedRows<T>, right: RankedRows<T>) -> anyhow::Result<RankedRows<T>> {
        // Rows arrive off the wire, so their alignment is rechecked.
        for rows in [&left, &right] {
            anyhow::ensure!(
                rows.ranks.len() == rows.data.len(),
                "row with {} ranks and {} elements",
                rows.ranks.len(),
                rows.data.len()
            );
        }
        left.ranks.extend(right.ranks);
        left.data.extend(right.data);
        Ok(left)
    }
}

/// Reduce local rank vectors along `tree`, which needs at least two
/// stages.
///
/// Stage 0 sums the rank vectors of each group at its coordinator; all
/// members rank the same shared data, so the sum is that data's rank
/// over every member's column. Every later stage concatenates the
/// coordinators' `(ranks, shared data)` in member order. Returns the
/// concatenation at the tree's root and `None` everywhere else.
#[tracing::instrument(level = "debug", skip_all, fields(rank = comm.rank()))]
pub async fn two_level_reduce<C, T>(
    comm: &mut C,
    tree: &FanInTree,
    local_ranks: RankVector,
    shared: Vec<T>,
) -> Result<Option<RankedRows<T>>, SortError>
where
    C: Communicator + ?Sized,
    T: Element,
{
    let levels = tree.stages().len();
    if levels < 2 {
        return Err(GridError::InvalidTree {
            reason: format!("rank reduction needs at least 2 stages, got {levels}"),
        }
        .into());
    }
    let rank = comm.rank();
    let group = move |level: usize| {
        tree.stage(level)
            .and_then(|stage| stage.group_of(rank))
            .ok_or_else(|| SortError::Protocol {
                rank,
                reason: format!("not a member of fan-in stage {level}"),
            })
    };

    let Some(row_ranks) = fan_in(
        comm,
        group(0)?,
        tags::ROW_RANKS,
        &RankSum::default(),
        local_ranks,
    )
    .await?
    else {
        return Ok(None);
    };
    let mut rows = RankedRows::new(row_ranks, shared)?;
    for level in 1..levels {
        match fan_in(comm, group(level)?, tags::ROOT_RANKS, &RowConcat::default(), rows).await? {
            Some(folded) => rows = folded,
            None => return Ok(None),
        }
    }
    tracing::debug!(root = tree.root(), len = rows.len(), "rank reduction complete");
    Ok(Some(rows))
}
