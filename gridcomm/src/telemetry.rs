/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Logging setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Environment variable holding the log filter directives, e.g.
/// `GRIDSORT_LOG=gridsort=debug,gridcomm=trace`.
pub const LOG_ENV: &str = "GRIDSORT_LOG";

const DEFAULT_FILTER: &str = "info";

/// Set up logging to stderr, filtered by [`LOG_ENV`] (default `info`).
/// Stage spans are reported when they close, with their timings.
/// Calling this more than once is harmless.
pub fn initialize_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .try_init()
    {
        tracing::debug!("logging already initialized for this process: {}", err);
    }
}
