/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Sort configuration.
//!
//! Built from defaults, overridden by environment variables or loaded
//! from YAML. All processes of a run must share one configuration.

use std::path::Path;

use gridcomm::config::parse_env;
use serde::Deserialize;
use serde::Serialize;

use crate::Comparison;

/// Environment variable overriding [`SortConfig::grid_side`].
pub const GRID_SIDE_ENV: &str = "GRIDSORT_GRID_SIDE";

/// Environment variable overriding [`SortConfig::comparison`].
pub const COMPARISON_ENV: &str = "GRIDSORT_COMPARISON";

const DEFAULT_GRID_SIDE: usize = 2;

/// Configuration of a grid sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Side of the square process grid.
    pub grid_side: usize,
    /// Comparison used when counting local ranks.
    pub comparison: Comparison,
    /// Messaging configuration.
    pub comm: gridcomm::Config,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            grid_side: DEFAULT_GRID_SIDE,
            comparison: Comparison::default(),
            comm: gridcomm::Config::default(),
        }
    }
}

impl SortConfig {
    pub fn new(grid_side: usize) -> Self {
        Self {
            grid_side,
            ..Self::default()
        }
    }

    /// Defaults overridden from the environment, messaging settings
    /// included.
    pub fn from_env() -> Self {
        let mut config = Self {
            comm: gridcomm::Config::from_env(),
            ..Self::default()
        };
        if let Some(side) = parse_env(GRID_SIDE_ENV) {
            config.grid_side = side;
        }
        if let Some(comparison) = parse_env(COMPARISON_ENV) {
            config.comparison = comparison;
        }
        config
    }

    /// Load configuration from a YAML file. Missing fields take their
    /// defaults.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Save configuration to a YAML file
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), anyhow::Error> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn with_comm(mut self, comm: gridcomm::Config) -> Self {
        self.comm = comm;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_from_env() {
        std::env::set_var(GRID_SIDE_ENV, "6");
        std::env::set_var(COMPARISON_ENV, "<");
        let config = SortConfig::from_env();
        std::env::remove_var(GRID_SIDE_ENV);
        std::env::remove_var(COMPARISON_ENV);
        assert_eq!(config.grid_side, 6);
        assert_eq!(config.comparison, Comparison::Below);
    }

    #[test]
    fn test_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sort.yaml");
        let config = SortConfig::new(3)
            .with_comparison(Comparison::Below)
            .with_comm(gridcomm::Config::new().with_stall_timeout(Duration::from_secs(2)));
        config.to_yaml(&path).unwrap();
        assert_eq!(SortConfig::from_yaml(&path).unwrap(), config);

        std::fs::write(&path, "grid_side: 4\ncomparison: at-most\n").unwrap();
        let loaded = SortConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded, SortConfig::new(4));
    }
}
