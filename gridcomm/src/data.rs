/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Length-prefixed message frames.
//!
//! A [`Frame`] is a bincode-encoded body preceded by its length as an
//! 8-byte big-endian `u64`. Frames are sized to their content; a body
//! larger than the configured maximum is rejected when the frame is
//! built and again when it is decoded, so data is never truncated.

use std::fmt;

use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Size of the length prefix.
pub const PREFIX_LEN: usize = 8;

/// Frame encoding errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("payload of {len} bytes exceeds maximum of {max} bytes")]
    TooLarge { len: usize, max: usize },

    #[error("frame truncated: expected {expected} body bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    #[error(transparent)]
    Bincode(#[from] Box<bincode::ErrorKind>),
}

/// An encoded message, including its length prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Encode `value`, failing if its body exceeds `max_len` bytes.
    pub fn encode<T: Serialize + ?Sized>(value: &T, max_len: usize) -> Result<Self, Error> {
        let body = bincode::serialize(value)?;
        if body.len() > max_len {
            return Err(Error::TooLarge {
                len: body.len(),
                max: max_len,
            });
        }
        let mut buf = BytesMut::with_capacity(PREFIX_LEN + body.len());
        buf.put_u64(body.len() as u64);
        buf.put_slice(&body);
        Ok(Self {
            bytes: buf.freeze(),
        })
    }

    /// Wrap raw bytes received from a transport. The prefix is
    /// validated against the body and against `max_len`.
    pub fn from_bytes(bytes: Bytes, max_len: usize) -> Result<Self, Error> {
        let frame = Self { bytes };
        frame.body(max_len)?;
        Ok(frame)
    }

    /// The number of body bytes that encoding `value` would produce.
    pub fn encoded_len<T: Serialize + ?Sized>(value: &T) -> Result<usize, Error> {
        Ok(bincode::serialized_size(value)? as usize)
    }

    /// Decode the frame body as a `T`.
    pub fn decode<T: DeserializeOwned>(&self, max_len: usize) -> Result<T, Error> {
        Ok(bincode::deserialize(self.body(max_len)?)?)
    }

    /// The body length declared by the prefix.
    pub fn body_len(&self) -> usize {
        self.bytes.len().saturating_sub(PREFIX_LEN)
    }

    /// The full frame, prefix included.
    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    fn body(&self, max_len: usize) -> Result<&[u8], Error> {
        let mut buf = &self.bytes[..];
        if buf.remaining() < PREFIX_LEN {
            return Err(Error::Truncated {
                expected: PREFIX_LEN,
                got: buf.remaining(),
            });
        }
        let len = buf.get_u64() as usize;
        if len > max_len {
            return Err(Error::TooLarge { len, max: max_len });
        }
        if buf.remaining() != len {
            return Err(Error::Truncated {
                expected: len,
                got: buf.remaining(),
            });
        }
        Ok(buf)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("body_len", &self.body_len())
            .finish()
    }
}
