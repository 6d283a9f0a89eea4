/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Column ring-gossip.
//!
//! In each of `G-1` rounds every process sends everything it holds to the
//! process below it in its column and receives from the process above,
//! wrapping around. After the last round every process in a column holds
//! the fragments of every column member.

use gridcomm::Communicator;
use gridcomm::Frame;
use gridslice::Grid;
use serde::Deserialize;
use serde::Serialize;

use crate::Element;
use crate::KeyedData;
use crate::SortError;
use crate::tags;

/// One round's message. Entries carry their origin rank, so receivers
/// never infer where data came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipMessage<T> {
    pub round: usize,
    pub entries: Vec<(usize, Vec<T>)>,
}

/// Run the column gossip for this process, growing `data` until it holds
/// every fragment of the process's column.
///
/// Each round's send and receive are issued non-blocking and both
/// complete before the next round begins, so the synchronous sends of a
/// column never form a waiting cycle.
#[tracing::instrument(level = "debug", skip_all, fields(rank = comm.rank()))]
pub async fn column_gossip<C, T>(
    comm: &mut C,
    grid: &Grid,
    data: &mut KeyedData<T>,
) -> Result<(), SortError>
where
    C: Communicator + ?Sized,
    T: Element,
{
    let rank = comm.rank();
    let (down, up) = (grid.down(rank), grid.up(rank));
    let column = grid.column_slice(grid.col(rank))?;
    for round in 0..grid.side().saturating_sub(1) {
        let message = GossipMessage {
            round,
            entries: data.entries(),
        };
        let frame = Frame::encode(&message, comm.max_payload_len())?;
        let recv = comm.irecv(up, tags::GOSSIP)?;
        let send = comm.isend(down, tags::GOSSIP, frame)?;
        let mut completions = comm.wait_all(vec![recv, send]).await?;
        let received: GossipMessage<T> = completions
            .swap_remove(0)
            .into_frame()?
            .decode(comm.max_payload_len())?;

        if received.round != round {
            return Err(SortError::Protocol {
                rank,
                reason: format!(
                    "gossip round {} message received from rank {up} during round {round}",
                    received.round
                ),
            });
        }
        let mut added = 0;
        for (origin, fragment) in received.entries {
            if !column.contains(origin) {
                return Err(SortError::Protocol {
                    rank,
                    reason: format!("gossip entry from rank {origin} outside column"),
                });
            }
            if data.insert(origin, fragment)? {
                added += 1;
            }
        }
        tracing::debug!(round, from = up, added, held = data.len(), "gossip round complete");
    }
    Ok(())
}
