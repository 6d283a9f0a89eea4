/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::SortError;

/// Data keyed by the rank that contributed it.
///
/// Keys iterate in ascending order, and [`KeyedData::concat`] in that
/// order is the canonical linearization: two maps with the same entries
/// always concatenate to the same sequence, whatever order the entries
/// arrived in. Entries are only ever added; an origin is never
/// overwritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedData<T> {
    entries: BTreeMap<usize, Vec<T>>,
}

impl<T> Default for KeyedData<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Clone + PartialEq> KeyedData<T> {
    /// A map holding only `origin`'s fragment.
    pub fn singleton(origin: usize, fragment: Vec<T>) -> Self {
        Self {
            entries: BTreeMap::from([(origin, fragment)]),
        }
    }

    /// Add `origin`'s data. Returns whether it was new; re-inserting
    /// identical data is a no-op and different data is an error.
    pub fn insert(&mut self, origin: usize, data: Vec<T>) -> Result<bool, SortError> {
        match self.entries.get(&origin) {
            Some(existing) if *existing == data => Ok(false),
            Some(_) => Err(SortError::Conflict { origin }),
            None => {
                self.entries.insert(origin, data);
                Ok(true)
            }
        }
    }

    /// Origins held, ascending.
    pub fn origins(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(origin, data)` pairs in ascending origin order.
    pub fn entries(&self) -> Vec<(usize, Vec<T>)> {
        self.entries
            .iter()
            .map(|(origin, data)| (*origin, data.clone()))
            .collect()
    }

    /// All data concatenated in ascending origin order.
    pub fn concat(&self) -> Vec<T> {
        self.entries.values().flatten().cloned().collect()
    }
}
