/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Tagged point-to-point envelopes and receive-side matching.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::oneshot;

/// A message tag. Receives match on `(source, tag)`, so distinct
/// protocol phases use distinct tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag(pub u32);

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A message in flight. The sender's rank travels with the message;
/// it is never inferred from the receiver's position. The payload is
/// the raw bytes of an encoded frame, validated by the receiver.
#[derive(Debug)]
pub struct Envelope {
    pub source: usize,
    pub tag: Tag,
    pub payload: Bytes,
    /// Signalled once a matching receive consumes the envelope.
    delivered: Option<oneshot::Sender<()>>,
}

impl Envelope {
    pub fn new(source: usize, tag: Tag, payload: Bytes) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                source,
                tag,
                payload,
                delivered: Some(tx),
            },
            rx,
        )
    }

    fn matches(&self, source: usize, tag: Tag) -> bool {
        self.source == source && self.tag == tag
    }

    /// Consume the envelope, notifying the sender of delivery.
    fn accept(mut self) -> Bytes {
        if let Some(delivered) = self.delivered.take() {
            // The sender may have given up waiting; nothing to report.
            let _ = delivered.send(());
        }
        self.payload
    }
}

#[derive(Debug)]
struct PostedRecv {
    id: u64,
    source: usize,
    tag: Tag,
}

/// Receive-side matching state of one endpoint.
///
/// Arrivals are matched against posted receives in posting order;
/// envelopes nobody has asked for yet are held in arrival order until a
/// receive for their `(source, tag)` is posted.
#[derive(Debug, Default)]
pub struct Matcher {
    next_id: u64,
    posted: Vec<PostedRecv>,
    unexpected: VecDeque<Envelope>,
    matched: HashMap<u64, Bytes>,
}

impl Matcher {
    /// Post a receive for `(source, tag)`, returning its id. If a
    /// matching envelope already arrived it is consumed immediately.
    pub fn post(&mut self, source: usize, tag: Tag) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let arrived = self
            .unexpected
            .iter()
            .position(|envelope| envelope.matches(source, tag))
            .and_then(|pos| self.unexpected.remove(pos));
        match arrived {
            Some(envelope) => {
                self.matched.insert(id, envelope.accept());
            }
            None => self.posted.push(PostedRecv { id, source, tag }),
        }
        id
    }

    /// Route an arriving envelope to the oldest matching posted
    /// receive, or hold it.
    pub fn deliver(&mut self, envelope: Envelope) {
        match self
            .posted
            .iter()
            .position(|posted| envelope.matches(posted.source, posted.tag))
        {
            Some(pos) => {
                let posted = self.posted.remove(pos);
                self.matched.insert(posted.id, envelope.accept());
            }
            None => self.unexpected.push_back(envelope),
        }
    }

    /// Take the payload matched to receive `id`, if any.
    pub fn take(&mut self, id: u64) -> Option<Bytes> {
        self.matched.remove(&id)
    }

    /// Withdraw receive `id`.
    pub fn cancel(&mut self, id: u64) {
        self.posted.retain(|posted| posted.id != id);
        self.matched.remove(&id);
    }

    /// Number of envelopes held without a matching receive.
    pub fn unexpected_len(&self) -> usize {
        self.unexpected.len()
    }
}
