/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Local rank computation.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

/// One count per element of a target sequence.
pub type RankVector = Vec<u64>;

/// How a candidate is compared against a target element when counting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Comparison {
    /// Count candidates `<=` the target. Summed over the whole input,
    /// this is the 1-based sorted position of the last of the target's
    /// equals.
    #[default]
    AtMost,
    /// Count candidates `<` the target: the number of elements that
    /// must precede it.
    Below,
}

impl Comparison {
    /// Whether `candidate` counts toward `target`'s rank.
    pub fn counts<T: Ord + ?Sized>(self, candidate: &T, target: &T) -> bool {
        match self {
            Comparison::AtMost => candidate <= target,
            Comparison::Below => candidate < target,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::AtMost => write!(f, "at-most"),
            Comparison::Below => write!(f, "below"),
        }
    }
}

/// Errors parsing a [`Comparison`].
#[derive(Debug, thiserror::Error)]
#[error("unknown comparison {0:?}: expected at-most (<=) or below (<)")]
pub struct ParseComparisonError(String);

impl FromStr for Comparison {
    type Err = ParseComparisonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "at-most" | "<=" | "le" => Ok(Comparison::AtMost),
            "below" | "<" | "lt" => Ok(Comparison::Below),
            other => Err(ParseComparisonError(other.to_string())),
        }
    }
}

/// For every element of `target`, count the elements of `local` that
/// count toward it under `comparison`.
pub fn local_rank<T: Ord>(local: &[T], target: &[T], comparison: Comparison) -> RankVector {
    target
        .iter()
        .map(|t| {
            local
                .iter()
                .filter(|candidate| comparison.counts(*candidate, t))
                .count() as u64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_ties_count_toward_rank() {
        let local = ['b', 'a', 'c', 'b'];
        let target = ['a', 'b', 'z', '0'];
        assert_eq!(
            local_rank(&local, &target, Comparison::AtMost),
            vec![1, 3, 4, 0]
        );
        assert_eq!(
            local_rank(&local, &target, Comparison::Below),
            vec![0, 1, 4, 0]
        );
    }

    #[test]
    fn test_empty_sides() {
        assert_eq!(local_rank::<u8>(&[], &[1, 2], Comparison::AtMost), vec![0, 0]);
        assert!(local_rank(&[1, 2], &[], Comparison::AtMost).is_empty());
    }

    #[test]
    fn test_parse_comparison() {
        assert_eq!("<=".parse::<Comparison>().unwrap(), Comparison::AtMost);
        assert_eq!("below".parse::<Comparison>().unwrap(), Comparison::Below);
        assert_eq!(
            Comparison::Below.to_string().parse::<Comparison>().unwrap(),
            Comparison::Below
        );
        assert!("==".parse::<Comparison>().is_err());
        assert_eq!(Comparison::default(), Comparison::AtMost);
    }

    proptest! {
        #[test]
        fn split_ranks_sum_to_whole(
            left in prop::collection::vec(0u8..16, 0..20),
            right in prop::collection::vec(0u8..16, 0..20),
            target in prop::collection::vec(0u8..16, 0..20),
        ) {
            let whole: Vec<u8> = left.iter().chain(&right).copied().collect();
            for comparison in [Comparison::AtMost, Comparison::Below] {
                let summed: RankVector = local_rank(&left, &target, comparison)
                    .into_iter()
                    .zip(local_rank(&right, &target, comparison))
                    .map(|(l, r)| l + r)
                    .collect();
                prop_assert_eq!(summed, local_rank(&whole, &target, comparison));
            }
        }
    }
}
