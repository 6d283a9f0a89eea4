/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Fan-in trees: the shape of a hierarchical reduction over a grid.
//!
//! A [`FanInTree`] is a sequence of stages. In each stage the ranks
//! that still hold a partial result are partitioned into groups; every
//! member of a group hands its value to the group's coordinator, which
//! folds the values in member order. Coordinators carry the folded
//! value into the next stage. The last stage has a single group whose
//! coordinator is the tree's root.

use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

use crate::Grid;
use crate::GridError;

/// One group of a fan-in stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanInGroup {
    coordinator: usize,
    members: Vec<usize>,
}

impl FanInGroup {
    /// A group folding `members` (in order) at `coordinator`, which
    /// must itself be a member.
    pub fn new(coordinator: usize, members: Vec<usize>) -> Result<Self, GridError> {
        if !members.contains(&coordinator) {
            return Err(GridError::InvalidTree {
                reason: format!("coordinator {coordinator} is not a member of {members:?}"),
            });
        }
        Ok(Self {
            coordinator,
            members,
        })
    }

    pub fn coordinator(&self) -> usize {
        self.coordinator
    }

    /// Members in fold order, coordinator included.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn contains(&self, rank: usize) -> bool {
        self.members.contains(&rank)
    }
}

/// A single level of a [`FanInTree`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanInStage {
    groups: Vec<FanInGroup>,
}

impl FanInStage {
    pub fn new(groups: Vec<FanInGroup>) -> Result<Self, GridError> {
        let mut seen = HashSet::new();
        for rank in groups.iter().flat_map(|group| group.members()) {
            if !seen.insert(*rank) {
                return Err(GridError::InvalidTree {
                    reason: format!("rank {rank} belongs to more than one group"),
                });
            }
        }
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[FanInGroup] {
        &self.groups
    }

    /// The group `rank` participates in at this stage, if any.
    pub fn group_of(&self, rank: usize) -> Option<&FanInGroup> {
        self.groups.iter().find(|group| group.contains(rank))
    }

    fn coordinators(&self) -> HashSet<usize> {
        self.groups.iter().map(FanInGroup::coordinator).collect()
    }

    fn members(&self) -> HashSet<usize> {
        self.groups
            .iter()
            .flat_map(|group| group.members().iter().copied())
            .collect()
    }
}

/// A multi-stage reduction tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanInTree {
    stages: Vec<FanInStage>,
}

impl FanInTree {
    /// Build a tree from its stages. The members of every stage after
    /// the first must be exactly the previous stage's coordinators,
    /// and the last stage must consist of a single group.
    pub fn new(stages: Vec<FanInStage>) -> Result<Self, GridError> {
        let Some(last) = stages.last() else {
            return Err(GridError::InvalidTree {
                reason: "a tree needs at least one stage".to_string(),
            });
        };
        if last.groups().len() != 1 {
            return Err(GridError::InvalidTree {
                reason: format!("last stage has {} groups", last.groups().len()),
            });
        }
        for (level, pair) in stages.windows(2).enumerate() {
            if pair[0].coordinators() != pair[1].members() {
                return Err(GridError::InvalidTree {
                    reason: format!(
                        "stage {} members are not the coordinators of stage {}",
                        level + 1,
                        level
                    ),
                });
            }
        }
        Ok(Self { stages })
    }

    /// The two-level tree of a square grid: each row folds at its
    /// diagonal rank, then the diagonal folds, in row order, at the
    /// grid's root.
    pub fn square(grid: &Grid) -> Result<Self, GridError> {
        let rows = (0..grid.side())
            .map(|row| {
                FanInGroup::new(
                    grid.diagonal_of_row(row),
                    grid.row_slice(row)?.iter().collect(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let diagonal = FanInGroup::new(grid.root(), grid.diagonal().iter().collect())?;
        Self::new(vec![FanInStage::new(rows)?, FanInStage::new(vec![diagonal])?])
    }

    pub fn stages(&self) -> &[FanInStage] {
        &self.stages
    }

    pub fn stage(&self, level: usize) -> Option<&FanInStage> {
        self.stages.get(level)
    }

    /// The rank holding the final result.
    pub fn root(&self) -> usize {
        self.stages
            .last()
            .and_then(|stage| stage.groups().first())
            .map(FanInGroup::coordinator)
            .unwrap_or_default()
    }
}
