/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use itertools::izip;
use serde::Deserialize;
use serde::Serialize;

/// The type of error for slice operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SliceError {
    #[error("invalid dims: expected {expected}, got {got}")]
    InvalidDims { expected: usize, got: usize },

    #[error("stride {stride} must be larger than size of previous space {space}")]
    StrideTooSmall { stride: usize, space: usize },

    #[error("index {index} out of range {total}")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("value {value} not in slice")]
    ValueNotInSlice { value: usize },

    #[error("dimension {dim} out of range for {ndims}-dimensional slice")]
    DimensionOutOfRange { dim: usize, ndims: usize },
}

/// Slice is a compact representation of process ranks laid out in a
/// flat world. Given an offset, sizes of each dimension, and strides
/// for each dimension, Slice computes the rank at any coordinate.
///
/// A 3x3 grid in row-major order is the slice `(0, [3, 3], [3, 1])`.
/// Fixing a row with [`Slice::at`] yields the row's ranks; the main
/// diagonal is the one-dimensional slice `(0, [3], [4])`:
/// ```
/// # use gridslice::Slice;
/// let grid = Slice::new_row_major([3, 3]);
/// assert!(grid.at(0, 1).unwrap().iter().eq([3, 4, 5]));
/// assert!(grid.at(1, 2).unwrap().iter().eq([2, 5, 8]));
///
/// let diagonal = Slice::new(0, vec![3], vec![4]).unwrap();
/// assert!(diagonal.iter().eq([0, 4, 8]));
/// ```
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Slice {
    offset: usize,
    sizes: Vec<usize>,
    strides: Vec<usize>,
}

impl Slice {
    /// Create a new Slice with the provided offset, sizes, and
    /// strides. Sizes and strides must have the same number of
    /// dimensions, and (ordered by stride) each stride must cover the
    /// space spanned by the dimensions below it, so that no two
    /// coordinates map to the same rank.
    pub fn new(offset: usize, sizes: Vec<usize>, strides: Vec<usize>) -> Result<Self, SliceError> {
        if sizes.len() != strides.len() {
            return Err(SliceError::InvalidDims {
                expected: sizes.len(),
                got: strides.len(),
            });
        }
        let mut spans: Vec<(usize, usize)> = strides
            .iter()
            .copied()
            .zip(sizes.iter().copied())
            .filter(|&(_, size)| size > 1)
            .collect();
        spans.sort();

        let mut space = 1;
        for (stride, size) in spans {
            if stride < space {
                return Err(SliceError::StrideTooSmall { stride, space });
            }
            space = stride * size;
        }

        Ok(Slice {
            offset,
            sizes,
            strides,
        })
    }

    /// Create a new slice of the given sizes in row-major order.
    pub fn new_row_major(sizes: impl Into<Vec<usize>>) -> Self {
        let sizes = sizes.into();
        let mut strides = vec![1; sizes.len()];
        for dim in (0..sizes.len().saturating_sub(1)).rev() {
            strides[dim] = strides[dim + 1] * sizes[dim + 1];
        }
        Self {
            offset: 0,
            sizes,
            strides,
        }
    }

    /// A one-dimensional slice of `len` ranks, `stride` apart. A
    /// single dimension with a nonzero stride never overlaps.
    pub(crate) fn new_strided(offset: usize, len: usize, stride: usize) -> Self {
        debug_assert!(stride > 0 || len <= 1);
        Self {
            offset,
            sizes: vec![len],
            strides: vec![stride],
        }
    }

    /// The number of dimensions in this slice.
    pub fn num_dim(&self) -> usize {
        self.sizes.len()
    }

    /// The rank at which the slice begins.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The size of each dimension.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// The distance, in ranks, between neighbours along each dimension.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Fix one coordinate, removing that dimension. The fixed
    /// coordinate's contribution (`index * stride`) is absorbed into
    /// the offset; the remaining dimensions keep their strides.
    ///
    /// Fixing dimension 0 of a row-major grid selects a row, fixing
    /// dimension 1 selects a column.
    pub fn at(&self, dim: usize, index: usize) -> Result<Self, SliceError> {
        if dim >= self.sizes.len() {
            return Err(SliceError::DimensionOutOfRange {
                dim,
                ndims: self.num_dim(),
            });
        }
        if index >= self.sizes[dim] {
            return Err(SliceError::IndexOutOfRange {
                index,
                total: self.sizes[dim],
            });
        }

        let mut sizes = self.sizes.clone();
        let mut strides = self.strides.clone();
        sizes.remove(dim);
        strides.remove(dim);
        Slice::new(self.offset + index * self.strides[dim], sizes, strides)
    }

    /// Return the rank at the provided coordinates.
    pub fn location(&self, coord: &[usize]) -> Result<usize, SliceError> {
        if coord.len() != self.sizes.len() {
            return Err(SliceError::InvalidDims {
                expected: self.sizes.len(),
                got: coord.len(),
            });
        }
        let mut rank = self.offset;
        for (&pos, &size, &stride) in izip!(coord, &self.sizes, &self.strides) {
            if pos >= size {
                return Err(SliceError::IndexOutOfRange {
                    index: pos,
                    total: size,
                });
            }
            rank += pos * stride;
        }
        Ok(rank)
    }

    /// Return the coordinates of the provided rank in this slice.
    pub fn coordinates(&self, value: usize) -> Result<Vec<usize>, SliceError> {
        let mut pos = value
            .checked_sub(self.offset)
            .ok_or(SliceError::ValueNotInSlice { value })?;
        let mut result = vec![0; self.sizes.len()];
        let mut dims: Vec<usize> = (0..self.sizes.len()).collect();
        dims.sort_by_key(|&dim| std::cmp::Reverse(self.strides[dim]));
        for dim in dims {
            let (size, stride) = (self.sizes[dim], self.strides[dim]);
            if size <= 1 || stride == 0 {
                continue;
            }
            let index = pos / stride;
            if index >= size {
                return Err(SliceError::ValueNotInSlice { value });
            }
            result[dim] = index;
            pos %= stride;
        }
        if pos != 0 {
            return Err(SliceError::ValueNotInSlice { value });
        }
        Ok(result)
    }

    /// Returns whether the provided rank is contained in this slice.
    pub fn contains(&self, value: usize) -> bool {
        self.coordinates(value).is_ok()
    }

    /// Return the rank at logical (row-major) position `index`.
    pub fn get(&self, index: usize) -> Result<usize, SliceError> {
        let total = self.len();
        if index >= total {
            return Err(SliceError::IndexOutOfRange { index, total });
        }
        let mut rank = self.offset;
        let mut rest = index;
        for (&size, &stride) in self.sizes.iter().zip(&self.strides).rev() {
            rank += (rest % size) * stride;
            rest /= size;
        }
        Ok(rank)
    }

    /// The number of ranks in the slice.
    pub fn len(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the slice's ranks in row-major order.
    pub fn iter(&self) -> SliceIterator<'_> {
        SliceIterator {
            slice: self,
            next: 0,
        }
    }
}

impl std::fmt::Display for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{:?}@{:?}", self.offset, self.sizes, self.strides)
    }
}

impl<'a> IntoIterator for &'a Slice {
    type Item = usize;
    type IntoIter = SliceIterator<'a>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterates over the ranks of a [`Slice`] in row-major order.
pub struct SliceIterator<'a> {
    slice: &'a Slice,
    next: usize,
}

impl Iterator for SliceIterator<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let rank = self.slice.get(self.next).ok()?;
        self.next += 1;
        Some(rank)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.slice.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SliceIterator<'_> {}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_row_major() {
        let s = Slice::new_row_major([4, 4, 4]);
        assert_eq!(s.strides(), &[16, 4, 1]);
        assert!(s.iter().eq(0..64));

        let s = Slice::new_row_major(Vec::new());
        assert_eq!(s.len(), 1);
        assert!(s.iter().eq([0]));
    }

    #[test]
    fn test_slice_validation() {
        assert!(matches!(
            Slice::new(0, vec![2, 3], vec![1]),
            Err(SliceError::InvalidDims {
                expected: 2,
                got: 1
            })
        ));
        assert!(matches!(
            Slice::new(0, vec![3, 3], vec![2, 1]),
            Err(SliceError::StrideTooSmall {
                stride: 2,
                space: 3
            })
        ));
        // Unit dimensions never overlap, whatever their stride.
        assert!(Slice::new(5, vec![1, 3], vec![0, 1]).is_ok());
    }

    #[test]
    fn test_at_selects_rows_and_columns() {
        let s = Slice::new_row_major([3, 3]);
        let row = s.at(0, 2).unwrap();
        assert_eq!(row.offset(), 6);
        assert!(row.iter().eq([6, 7, 8]));

        let col = s.at(1, 1).unwrap();
        assert_eq!(col.strides(), &[3]);
        assert!(col.iter().eq([1, 4, 7]));

        assert!(matches!(
            s.at(2, 0),
            Err(SliceError::DimensionOutOfRange { dim: 2, ndims: 2 })
        ));
        assert!(matches!(
            s.at(0, 3),
            Err(SliceError::IndexOutOfRange { index: 3, total: 3 })
        ));
    }

    #[test]
    fn test_location_and_coordinates() {
        let s = Slice::new_row_major([3, 4]);
        assert_eq!(s.location(&[2, 1]).unwrap(), 9);
        assert_eq!(s.coordinates(9).unwrap(), vec![2, 1]);
        assert!(s.location(&[3, 0]).is_err());
        assert!(s.coordinates(12).is_err());

        let diagonal = Slice::new_strided(0, 4, 5);
        assert_eq!(diagonal, Slice::new(0, vec![4], vec![5]).unwrap());
        assert!(diagonal.contains(10));
        assert!(!diagonal.contains(11));
        assert_eq!(diagonal.coordinates(15).unwrap(), vec![3]);
    }

    #[test]
    fn test_get_out_of_range() {
        let s = Slice::new(2, vec![3], vec![4]).unwrap();
        assert_eq!(s.get(2).unwrap(), 10);
        assert!(matches!(
            s.get(3),
            Err(SliceError::IndexOutOfRange { index: 3, total: 3 })
        ));
    }

    proptest! {
        #[test]
        fn coordinates_invert_location(rows in 1usize..8, cols in 1usize..8, seed in any::<usize>()) {
            let s = Slice::new_row_major([rows, cols]);
            let rank = seed % s.len();
            let coords = s.coordinates(rank).unwrap();
            prop_assert_eq!(s.location(&coords).unwrap(), rank);
            prop_assert_eq!(s.get(rank).unwrap(), rank);
        }
    }
}
