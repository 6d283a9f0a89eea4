/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Configuration for communicator endpoints.
//!
//! Values come from defaults, environment variables, or YAML files.
//! Every endpoint of a world must be built from the same configuration.

use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Environment variable overriding [`Config::max_payload_len`].
pub const MAX_PAYLOAD_LEN_ENV: &str = "GRIDCOMM_MAX_PAYLOAD_LEN";

/// Environment variable overriding [`Config::stall_timeout`], in
/// milliseconds.
pub const STALL_TIMEOUT_MS_ENV: &str = "GRIDCOMM_STALL_TIMEOUT_MS";

const DEFAULT_MAX_PAYLOAD_LEN: usize = 1024 * 1024; // 1 MB
const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Communicator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    max_payload_len: usize,
    stall_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables. Unparseable
    /// values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(len) = parse_env::<usize>(MAX_PAYLOAD_LEN_ENV) {
            config.max_payload_len = len;
        }
        if let Some(ms) = parse_env::<u64>(STALL_TIMEOUT_MS_ENV) {
            config.stall_timeout = Duration::from_millis(ms);
        }
        config
    }

    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Save configuration to a YAML file
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), anyhow::Error> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// The largest frame body an endpoint sends or accepts.
    pub fn max_payload_len(&self) -> usize {
        self.max_payload_len
    }

    /// How long a blocking operation may wait before it is reported as
    /// stalled.
    pub fn stall_timeout(&self) -> Duration {
        self.stall_timeout
    }

    pub fn with_max_payload_len(mut self, value: usize) -> Self {
        self.max_payload_len = value;
        self
    }

    pub fn with_stall_timeout(mut self, value: Duration) -> Self {
        self.stall_timeout = value;
        self
    }
}

/// Parse environment variable `name`, logging values that fail to
/// parse.
pub fn parse_env<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::error!("failed to override config from \"{}\" in ${}: {}", value, name, e);
            None
        }
    }
}
