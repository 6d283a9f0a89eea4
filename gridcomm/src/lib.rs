/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Point-to-point messaging for a fixed world of ranked processes.
//!
//! A [`Communicator`] provides synchronous and non-blocking tagged
//! sends and receives, explicit waits, and a barrier. Messages travel as
//! length-prefixed [`Frame`]s whose size is bounded by configuration, and
//! every blocking operation gives up with [`CommError::Stalled`] after
//! the configured stall timeout rather than hanging.
//!
//! [`LocalWorld`] implements the world in process: each rank is a tokio
//! task and messages move over channels.
//!
//! ```
//! use gridcomm::CommExt;
//! use gridcomm::Communicator;
//! use gridcomm::Config;
//! use gridcomm::LocalWorld;
//! use gridcomm::Tag;
//!
//! # tokio_test();
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn tokio_test() {
//! let results = LocalWorld::new(2, &Config::new())
//!     .run(|mut comm| async move {
//!         let peer = 1 - comm.rank();
//!         let send = comm.isend(peer, Tag(0), gridcomm::Frame::encode(&comm.rank(), 64)?)?;
//!         let received: usize = comm.recv_value(peer, Tag(0)).await?;
//!         comm.wait(send).await?;
//!         Ok::<_, gridcomm::CommError>(received)
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(results[0].as_ref().unwrap(), &1);
//! assert_eq!(results[1].as_ref().unwrap(), &0);
//! # }
//! ```

pub mod accum;
pub mod channel;
pub mod comm;
pub mod config;
pub mod data;
pub mod local;
pub mod telemetry;

pub use channel::Tag;
pub use comm::CommError;
pub use comm::CommExt;
pub use comm::Communicator;
pub use comm::Completion;
pub use comm::Op;
pub use comm::Request;
pub use config::Config;
pub use data::Frame;
pub use local::LocalComm;
pub use local::LocalWorld;
