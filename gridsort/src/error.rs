/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use gridcomm::CommError;
use gridcomm::data;
use gridslice::GridError;

/// Errors raised while planning or running a grid sort.
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    /// Invalid topology: world size mismatch, bad rank, empty grid.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Messaging failures, including stalls.
    #[error(transparent)]
    Comm(#[from] CommError),

    #[error("input of length {len} cannot be split evenly across {processes} processes")]
    Indivisible { len: usize, processes: usize },

    /// The largest message of the run would not fit in a frame.
    #[error(
        "messages of up to {needed} bytes are needed but the maximum payload is {max} bytes"
    )]
    PayloadBound { needed: usize, max: usize },

    /// A peer sent something the protocol does not allow.
    #[error("protocol violation at rank {rank}: {reason}")]
    Protocol { rank: usize, reason: String },

    /// Gossip delivered different data for an origin already held.
    #[error("conflicting data received for origin {origin}")]
    Conflict { origin: usize },

    /// Ranks and elements that must correspond have different lengths.
    #[error("{ranks} ranks cannot be paired with {elements} elements")]
    Misaligned { ranks: usize, elements: usize },

    /// A fan-in reducer rejected its inputs.
    #[error("reduction failed at rank {rank}: {source}")]
    Reduce {
        rank: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

impl From<data::Error> for SortError {
    fn from(err: data::Error) -> Self {
        Self::Comm(err.into())
    }
}

impl SortError {
    /// Whether this error is a stall, which is usually a consequence of
    /// a failure elsewhere rather than its cause.
    pub fn is_stall(&self) -> bool {
        matches!(self, Self::Comm(CommError::Stalled { .. }))
    }
}
