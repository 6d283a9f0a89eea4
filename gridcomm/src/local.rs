/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Local (in-process) worlds. Each rank is a tokio task owning a
//! [`LocalComm`]; ranks exchange envelopes over unbounded mpsc channels
//! and share one barrier.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Barrier;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinError;

use crate::channel::Envelope;
use crate::channel::Matcher;
use crate::channel::Tag;
use crate::comm::CommError;
use crate::comm::Communicator;
use crate::comm::Completion;
use crate::comm::Op;
use crate::comm::Request;
use crate::config::Config;
use crate::data;
use crate::data::Frame;

/// A fixed set of in-process endpoints, one per rank.
#[derive(Debug)]
pub struct LocalWorld {
    comms: Vec<LocalComm>,
}

impl LocalWorld {
    /// Create a world of `size` ranks.
    pub fn new(size: usize, config: &Config) -> Self {
        let (peers, inboxes): (Vec<_>, Vec<_>) =
            (0..size).map(|_| mpsc::unbounded_channel()).unzip();
        let barrier = Arc::new(Barrier::new(size.max(1)));
        let comms = inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalComm {
                rank,
                peers: peers.clone(),
                inbox,
                matcher: Matcher::default(),
                barrier: Arc::clone(&barrier),
                max_payload_len: config.max_payload_len(),
                stall_timeout: config.stall_timeout(),
            })
            .collect();
        Self { comms }
    }

    pub fn size(&self) -> usize {
        self.comms.len()
    }

    /// The endpoints, in rank order.
    pub fn into_comms(self) -> Vec<LocalComm> {
        self.comms
    }

    /// Run `f` on every rank concurrently, one task per rank, and
    /// collect the results in rank order.
    pub async fn run<F, Fut, T>(self, mut f: F) -> Result<Vec<T>, JoinError>
    where
        F: FnMut(LocalComm) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let handles: Vec<_> = self
            .comms
            .into_iter()
            .map(|comm| tokio::spawn(f(comm)))
            .collect();
        futures::future::try_join_all(handles).await
    }
}

/// One rank's endpoint in a [`LocalWorld`].
#[derive(Debug)]
pub struct LocalComm {
    rank: usize,
    peers: Vec<mpsc::UnboundedSender<Envelope>>,
    inbox: mpsc::UnboundedReceiver<Envelope>,
    matcher: Matcher,
    barrier: Arc<Barrier>,
    max_payload_len: usize,
    stall_timeout: Duration,
}

enum Event {
    Delivered(bool),
    Arrived(Option<Envelope>),
}

impl LocalComm {
    fn check_rank(&self, rank: usize) -> Result<(), CommError> {
        if rank >= self.peers.len() {
            return Err(CommError::InvalidRank {
                rank,
                size: self.peers.len(),
            });
        }
        Ok(())
    }

    fn stalled(&self, op: Op, peer: Option<usize>) -> CommError {
        tracing::error!(
            rank = self.rank,
            %op,
            ?peer,
            unmatched = self.matcher.unexpected_len(),
            "stalled after {:?}",
            self.stall_timeout
        );
        CommError::Stalled {
            op,
            peer,
            timeout: self.stall_timeout,
        }
    }

    /// Route arrivals until receive `id` is matched.
    async fn matched(&mut self, id: u64) -> Result<Bytes, CommError> {
        loop {
            if let Some(payload) = self.matcher.take(id) {
                return Ok(payload);
            }
            match self.inbox.recv().await {
                Some(envelope) => self.matcher.deliver(envelope),
                None => return Err(CommError::Closed(self.rank)),
            }
        }
    }

    /// Route arrivals until `dest` has matched our message. Arrivals
    /// keep flowing so that peers blocked on us can make progress.
    async fn delivered(
        &mut self,
        dest: usize,
        mut delivered: oneshot::Receiver<()>,
    ) -> Result<(), CommError> {
        loop {
            let event = tokio::select! {
                biased;
                result = &mut delivered => Event::Delivered(result.is_ok()),
                envelope = self.inbox.recv() => Event::Arrived(envelope),
            };
            match event {
                Event::Delivered(true) => return Ok(()),
                Event::Delivered(false) => return Err(CommError::Closed(dest)),
                Event::Arrived(Some(envelope)) => self.matcher.deliver(envelope),
                Event::Arrived(None) => return Err(CommError::Closed(self.rank)),
            }
        }
    }
}

#[async_trait]
impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn max_payload_len(&self) -> usize {
        self.max_payload_len
    }

    fn isend(&mut self, dest: usize, tag: Tag, frame: Frame) -> Result<Request, CommError> {
        self.check_rank(dest)?;
        if frame.body_len() > self.max_payload_len {
            return Err(data::Error::TooLarge {
                len: frame.body_len(),
                max: self.max_payload_len,
            }
            .into());
        }
        tracing::trace!(rank = self.rank, dest, %tag, len = frame.body_len(), "isend");
        let (envelope, delivered) = Envelope::new(self.rank, tag, frame.into_bytes());
        self.peers[dest]
            .send(envelope)
            .map_err(|_| CommError::Closed(dest))?;
        Ok(Request::Send { dest, delivered })
    }

    fn irecv(&mut self, source: usize, tag: Tag) -> Result<Request, CommError> {
        self.check_rank(source)?;
        tracing::trace!(rank = self.rank, source, %tag, "irecv");
        let id = self.matcher.post(source, tag);
        Ok(Request::Recv { id, source, tag })
    }

    async fn wait(&mut self, request: Request) -> Result<Completion, CommError> {
        let stall_timeout = self.stall_timeout;
        match request {
            Request::Send { dest, delivered } => {
                tokio::time::timeout(stall_timeout, self.delivered(dest, delivered))
                    .await
                    .map_err(|_| self.stalled(Op::Send, Some(dest)))??;
                Ok(Completion::Sent)
            }
            Request::Recv { id, source, .. } => {
                match tokio::time::timeout(stall_timeout, self.matched(id)).await {
                    Ok(payload) => {
                        let frame = Frame::from_bytes(payload?, self.max_payload_len)?;
                        Ok(Completion::Received(frame))
                    }
                    Err(_) => {
                        self.matcher.cancel(id);
                        Err(self.stalled(Op::Recv, Some(source)))
                    }
                }
            }
        }
    }

    async fn barrier(&mut self) -> Result<(), CommError> {
        tracing::debug!(rank = self.rank, "entering barrier");
        tokio::time::timeout(self.stall_timeout, self.barrier.wait())
            .await
            .map_err(|_| self.stalled(Op::Barrier, None))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::CommExt;

    const TAG: Tag = Tag(1);

    fn config() -> Config {
        Config::new().with_stall_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_send_recv() {
        let results = LocalWorld::new(2, &config())
            .run(|mut comm| async move {
                if comm.rank() == 0 {
                    comm.send_value(1, TAG, &"hello".to_string()).await?;
                    Ok::<_, CommError>(None)
                } else {
                    comm.recv_value::<String>(0, TAG).await.map(Some)
                }
            })
            .await
            .unwrap();
        let results: Vec<Option<String>> = results
            .into_iter()
            .collect::<Result<_, CommError>>()
            .unwrap();
        assert_eq!(results, vec![None, Some("hello".to_string())]);
    }

    #[tokio::test]
    async fn test_ring_exchange_with_synchronous_sends() {
        // Every rank sends to its successor and receives from its
        // predecessor. Blocking sends alone would deadlock the ring;
        // isend/irecv pairs must not.
        let size = 5;
        let results = LocalWorld::new(size, &config())
            .run(move |mut comm| async move {
                let rank = comm.rank();
                let frame = Frame::encode(&rank, comm.max_payload_len())?;
                let send = comm.isend((rank + 1) % size, TAG, frame)?;
                let recv = comm.irecv((rank + size - 1) % size, TAG)?;
                // Wait on the send first: progress on our own receive
                // must not depend on the order of waits.
                let mut completions = comm.wait_all(vec![send, recv]).await?;
                let frame = completions.remove(1).into_frame()?;
                Ok::<usize, CommError>(frame.decode(comm.max_payload_len())?)
            })
            .await
            .unwrap();
        for (rank, received) in results.into_iter().enumerate() {
            assert_eq!(received.unwrap(), (rank + size - 1) % size);
        }
    }

    #[tokio::test]
    async fn test_tags_are_matched_independently() {
        let results = LocalWorld::new(2, &config())
            .run(|mut comm| async move {
                if comm.rank() == 0 {
                    let first = comm.isend(1, Tag(1), Frame::encode(&1u32, 64)?)?;
                    let second = comm.isend(1, Tag(2), Frame::encode(&2u32, 64)?)?;
                    comm.wait_all(vec![first, second]).await?;
                    Ok::<_, CommError>(vec![])
                } else {
                    let two: u32 = comm.recv_value(0, Tag(2)).await?;
                    let one: u32 = comm.recv_value(0, Tag(1)).await?;
                    Ok::<_, CommError>(vec![two, one])
                }
            })
            .await
            .unwrap();
        assert_eq!(results[1].as_ref().unwrap(), &vec![2, 1]);
    }

    #[tracing_test::traced_test]
    #[tokio::test(start_paused = true)]
    async fn test_missing_message_stalls() {
        let mut comms = LocalWorld::new(2, &config()).into_comms();
        let mut idle = comms.pop().unwrap();
        let mut waiting = comms.pop().unwrap();

        let err = waiting.recv(1, TAG).await.unwrap_err();
        assert!(matches!(
            err,
            CommError::Stalled {
                op: Op::Recv,
                peer: Some(1),
                ..
            }
        ));
        assert_eq!(err.to_string(), "recv with rank 1 stalled after 5s");
        assert!(logs_contain("stalled after 5s"));
        assert!(logs_contain("unmatched=0"));

        // A synchronous send nobody receives stalls too.
        let err = idle.send(0, TAG, Frame::encode(&0u8, 64).unwrap()).await;
        assert!(matches!(
            err,
            Err(CommError::Stalled {
                op: Op::Send,
                peer: Some(0),
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_barrier_requires_everyone() {
        let mut comms = LocalWorld::new(3, &config()).into_comms();
        let mut last = comms.pop().unwrap();
        let handles: Vec<_> = comms
            .into_iter()
            .map(|mut comm| tokio::spawn(async move { comm.barrier().await }))
            .collect();
        last.barrier().await.unwrap();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut lonely = LocalWorld::new(2, &config()).into_comms().remove(0);
        assert!(matches!(
            lonely.barrier().await,
            Err(CommError::Stalled {
                op: Op::Barrier,
                peer: None,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_payload_limits() {
        let config = config().with_max_payload_len(16);
        let mut comms = LocalWorld::new(2, &config).into_comms();
        let big = Frame::encode(&vec![0u8; 64], 1024).unwrap();
        assert!(matches!(
            comms[0].isend(1, TAG, big),
            Err(CommError::Data(data::Error::TooLarge { max: 16, .. }))
        ));
        assert!(matches!(
            comms[0].send_value(1, TAG, &vec![0u8; 64]).await,
            Err(CommError::Data(data::Error::TooLarge { .. }))
        ));
        assert!(matches!(
            comms[0].isend(2, TAG, Frame::encode(&0u8, 16).unwrap()),
            Err(CommError::InvalidRank { rank: 2, size: 2 })
        ));
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_fails() {
        let mut comms = LocalWorld::new(2, &config()).into_comms();
        drop(comms.pop());
        assert!(matches!(
            comms[0].send(1, TAG, Frame::encode(&0u8, 64).unwrap()).await,
            Err(CommError::Closed(1))
        ));
    }
}
