/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Splitting the input across processes.

use crate::SortError;

/// The fragment length for `len` elements over `processes` processes.
pub fn fragment_len(len: usize, processes: usize) -> Result<usize, SortError> {
    if processes == 0 || len % processes != 0 {
        return Err(SortError::Indivisible { len, processes });
    }
    Ok(len / processes)
}

/// Split `input` into `processes` equal contiguous fragments, the i-th
/// going to rank i.
pub fn scatter<T: Clone>(input: &[T], processes: usize) -> Result<Vec<Vec<T>>, SortError> {
    let len = fragment_len(input.len(), processes)?;
    if len == 0 {
        return Ok(vec![Vec::new(); processes]);
    }
    Ok(input.chunks(len).map(<[T]>::to_vec).collect())
}
