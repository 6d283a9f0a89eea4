/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The messaging primitives consumed by grid protocols.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use enum_as_inner::EnumAsInner;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;

use crate::channel::Tag;
use crate::data;
use crate::data::Frame;

/// A blocking operation, as reported in stall errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Send,
    Recv,
    Barrier,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Send => write!(f, "send"),
            Op::Recv => write!(f, "recv"),
            Op::Barrier => write!(f, "barrier"),
        }
    }
}

/// The type of error that can occur on communicator operations.
#[derive(thiserror::Error, Debug)]
pub enum CommError {
    /// A peer rank outside the world was addressed.
    #[error("rank {rank} out of range for world of size {size}")]
    InvalidRank { rank: usize, size: usize },

    /// An operation did not complete within the stall timeout. This is
    /// how a missing or misrouted message surfaces.
    #[error("{op}{} stalled after {timeout:?}", .peer.map(|p| format!(" with rank {p}")).unwrap_or_default())]
    Stalled {
        op: Op,
        peer: Option<usize>,
        timeout: Duration,
    },

    /// The peer's endpoint was dropped.
    #[error("channel to rank {0} closed")]
    Closed(usize),

    /// A send request was waited on as if it were a receive.
    #[error("request completed without a received frame")]
    NotReceived,

    /// Frame encoding or capacity errors.
    #[error(transparent)]
    Data(#[from] data::Error),

    /// Some other error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A handle to an outstanding non-blocking operation.
#[derive(Debug, EnumAsInner)]
pub enum Request {
    /// Completes when the destination has matched the message.
    Send {
        dest: usize,
        delivered: oneshot::Receiver<()>,
    },
    /// Completes when a message from `source` with `tag` has arrived.
    Recv { id: u64, source: usize, tag: Tag },
}

/// The result of waiting on a [`Request`].
#[derive(Debug, EnumAsInner)]
pub enum Completion {
    Sent,
    Received(Frame),
}

impl Completion {
    /// The received frame, or [`CommError::NotReceived`].
    pub fn into_frame(self) -> Result<Frame, CommError> {
        self.into_received().map_err(|_| CommError::NotReceived)
    }
}

/// A process's endpoint into a fixed world of peers.
///
/// Sends are synchronous: `send` and a waited `isend` complete only once
/// the destination has matched the message with a receive. Every
/// blocking operation is bounded by the endpoint's stall timeout.
#[async_trait]
pub trait Communicator: Send {
    /// This process's rank.
    fn rank(&self) -> usize;

    /// The number of processes in the world.
    fn size(&self) -> usize;

    /// The largest frame body this endpoint will send or accept.
    fn max_payload_len(&self) -> usize;

    /// Start sending `frame` to `dest`.
    fn isend(&mut self, dest: usize, tag: Tag, frame: Frame) -> Result<Request, CommError>;

    /// Post a receive for the next message from `source` with `tag`.
    fn irecv(&mut self, source: usize, tag: Tag) -> Result<Request, CommError>;

    /// Block until `request` completes.
    async fn wait(&mut self, request: Request) -> Result<Completion, CommError>;

    /// Block until every request completes, returning completions in
    /// request order.
    async fn wait_all(&mut self, requests: Vec<Request>) -> Result<Vec<Completion>, CommError> {
        let mut completions = Vec::with_capacity(requests.len());
        for request in requests {
            completions.push(self.wait(request).await?);
        }
        Ok(completions)
    }

    /// Send `frame` to `dest`, blocking until it has been received.
    async fn send(&mut self, dest: usize, tag: Tag, frame: Frame) -> Result<(), CommError> {
        let request = self.isend(dest, tag, frame)?;
        self.wait(request).await?;
        Ok(())
    }

    /// Receive the next message from `source` with `tag`.
    async fn recv(&mut self, source: usize, tag: Tag) -> Result<Frame, CommError> {
        let request = self.irecv(source, tag)?;
        self.wait(request).await?.into_frame()
    }

    /// Block until every process in the world has entered the barrier.
    async fn barrier(&mut self) -> Result<(), CommError>;
}

/// Typed send and receive on top of [`Communicator`].
#[async_trait]
pub trait CommExt: Communicator {
    /// Encode and send `value`.
    async fn send_value<T: Serialize + Sync + ?Sized>(
        &mut self,
        dest: usize,
        tag: Tag,
        value: &T,
    ) -> Result<(), CommError> {
        let frame = Frame::encode(value, self.max_payload_len())?;
        self.send(dest, tag, frame).await
    }

    /// Receive and decode a `T`.
    async fn recv_value<T: DeserializeOwned + Send>(
        &mut self,
        source: usize,
        tag: Tag,
    ) -> Result<T, CommError> {
        let frame = self.recv(source, tag).await?;
        Ok(frame.decode(self.max_payload_len())?)
    }
}

impl<C: Communicator + ?Sized> CommExt for C {}
