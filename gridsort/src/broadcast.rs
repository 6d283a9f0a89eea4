/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Diagonal row-broadcast.

use gridcomm::CommExt;
use gridcomm::Communicator;
use gridcomm::Frame;
use gridslice::Grid;

use crate::Element;
use crate::SortError;
use crate::tags;

/// Share the column data of each row's diagonal process with its row.
///
/// The diagonal process of row `r` sends `column_data` (column `r`'s
/// data, after gossip) to every other process of the row; the others
/// receive exactly one message from it. Every process of the row returns
/// the same shared data.
#[tracing::instrument(level = "debug", skip_all, fields(rank = comm.rank()))]
pub async fn row_broadcast<C, T>(
    comm: &mut C,
    grid: &Grid,
    column_data: &[T],
) -> Result<Vec<T>, SortError>
where
    C: Communicator + ?Sized,
    T: Element,
{
    let rank = comm.rank();
    let row = grid.row(rank);
    let diagonal = grid.diagonal_of_row(row);
    if rank != diagonal {
        let shared: Vec<T> = comm.recv_value(diagonal, tags::BROADCAST).await?;
        tracing::debug!(from = diagonal, len = shared.len(), "received row data");
        return Ok(shared);
    }

    // Encode once; frames share their buffer.
    let frame = Frame::encode(column_data, comm.max_payload_len())?;
    for dest in grid.row_slice(row)?.iter().filter(|&dest| dest != rank) {
        comm.send(dest, tags::BROADCAST, frame.clone()).await?;
    }
    tracing::debug!(len = column_data.len(), peers = grid.side() - 1, "broadcast row data");
    Ok(column_data.to_vec())
}
