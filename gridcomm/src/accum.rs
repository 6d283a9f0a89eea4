/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Defines the reducer trait used by fan-in, and some common reducers.

use std::marker::PhantomData;
use std::ops::AddAssign;

/// Reducer for updates gathered at a coordinator. Updates are reduced in
/// member order: `left` always precedes `right`, so reducers need only be
/// associative, not commutative.
pub trait CommReducer {
    /// The type of updates to be reduced.
    type Update;

    /// Reduce 2 updates into a single update.
    fn reduce(&self, left: Self::Update, right: Self::Update) -> anyhow::Result<Self::Update>;
}

/// Reduce a non-empty vector of updates, left to right. Return Error if
/// the vector is empty.
pub fn reduce_updates<R: CommReducer>(
    reducer: &R,
    updates: Vec<R::Update>,
) -> anyhow::Result<R::Update> {
    let mut iter = updates.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty updates"))?;
    iter.try_fold(first, |acc, update| reducer.reduce(acc, update))
}

/// Element-wise sum of equal-length vectors.
#[derive(Debug)]
pub struct ElementwiseSum<T>(PhantomData<T>);

impl<T> Default for ElementwiseSum<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: AddAssign> CommReducer for ElementwiseSum<T> {
    type Update = Vec<T>;

    fn reduce(&self, mut left: Vec<T>, right: Vec<T>) -> anyhow::Result<Vec<T>> {
        anyhow::ensure!(
            left.len() == right.len(),
            "cannot sum vectors of length {} and {}",
            left.len(),
            right.len()
        );
        for (acc, value) in left.iter_mut().zip(right) {
            *acc += value;
        }
        Ok(left)
    }
}

/// Concatenation of vectors, in reduction order.
#[derive(Debug)]
pub struct Concat<T>(PhantomData<T>);

impl<T> Default for Concat<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> CommReducer for Concat<T> {
    type Update = Vec<T>;

    fn reduce(&self, mut left: Vec<T>, right: Vec<T>) -> anyhow::Result<Vec<T>> {
        left.extend(right);
        Ok(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elementwise_sum() {
        let reducer = ElementwiseSum::<u64>::default();
        let sum = reduce_updates(&reducer, vec![vec![1, 2, 3], vec![10, 20, 30], vec![0, 0, 1]])
            .unwrap();
        assert_eq!(sum, vec![11, 22, 34]);

        let err = reducer.reduce(vec![1, 2], vec![1]).unwrap_err();
        assert_eq!(err.to_string(), "cannot sum vectors of length 2 and 1");
    }

    #[test]
    fn test_concat_preserves_order() {
        let reducer = Concat::<char>::default();
        let joined = reduce_updates(&reducer, vec![vec!['c'], vec!['a', 'b'], vec![]]).unwrap();
        assert_eq!(joined, vec!['c', 'a', 'b']);
    }

    #[test]
    fn test_reduce_updates() {
        let reducer = ElementwiseSum::<u64>::default();
        assert!(reduce_updates(&reducer, vec![]).is_err());
        assert_eq!(reduce_updates(&reducer, vec![vec![4]]).unwrap(), vec![4]);
    }
}
