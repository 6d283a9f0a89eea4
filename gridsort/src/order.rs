/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Final ordering at the root.

use itertools::Itertools;

use crate::SortError;

/// Order `elements` by their global `ranks`. Elements with equal rank
/// are ordered by value, so the output is deterministic for duplicates.
pub fn order_by_rank<T: Ord + Clone>(ranks: &[u64], elements: &[T]) -> Result<Vec<T>, SortError> {
    if ranks.len() != elements.len() {
        return Err(SortError::Misaligned {
            ranks: ranks.len(),
            elements: elements.len(),
        });
    }
    Ok(ranks
        .iter()
        .copied()
        .zip(elements.iter().cloned())
        .sorted()
        .map(|(_, element)| element)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_rank_then_value() {
        let elements = ['d', 'b', 'a', 'b'];
        let ranks = [4, 3, 1, 3];
        assert_eq!(
            order_by_rank(&ranks, &elements).unwrap(),
            vec!['a', 'b', 'b', 'd']
        );

        // Rank decides even against value order.
        assert_eq!(order_by_rank(&[2, 1], &['a', 'z']).unwrap(), vec!['z', 'a']);
    }

    #[test]
    fn test_misaligned_input_is_rejected() {
        assert!(matches!(
            order_by_rank(&[1, 2, 3], &['a', 'b']),
            Err(SortError::Misaligned {
                ranks: 3,
                elements: 2
            })
        ));
        assert!(order_by_rank::<u8>(&[], &[]).unwrap().is_empty());
    }
}
