/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Analytic cost model of the grid sort.
//!
//! Costs are in abstract time units for `p` processes sorting `n`
//! elements, with per-message latency `alpha`, bandwidth `beta`, and
//! fixed per-process startup cost `x`.

use serde::Deserialize;
use serde::Serialize;

/// Parameters of the cost model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub n: f64,
    pub x: f64,
    pub alpha: f64,
    pub beta: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            n: 14400.0,
            x: 5.0,
            alpha: 2.0,
            beta: 3.0,
        }
    }
}

/// Estimated costs for one process count.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub processes: f64,
    /// Cost of this implementation.
    pub implemented: f64,
    /// Cost of an ideal tree-structured implementation.
    pub ideal: f64,
}

impl CostModel {
    /// Startup and scatter, the rank-stage exchanges, and the local sort
    /// of a row's data.
    pub fn implemented(&self, p: f64) -> f64 {
        let root_p = p.sqrt();
        let row = self.n / root_p;
        2.0 * p * (self.x + self.n / (p * self.beta))
            + 3.0 * root_p * (self.alpha + row * self.beta)
            + 2.0 * row * row.ln()
    }

    pub fn ideal(&self, p: f64) -> f64 {
        let root_p = p.sqrt();
        let row = self.n / root_p;
        let row_message = self.alpha + row * self.beta;
        p * (self.alpha + self.n / (p * self.beta))
            + 2.0 * root_p.ln() * row_message
            + root_p * root_p.ln() * row_message
            + 2.0 * row * row.ln()
            + root_p * row_message
    }

    pub fn estimate(&self, p: f64) -> Estimate {
        Estimate {
            processes: p,
            implemented: self.implemented(p),
            ideal: self.ideal(p),
        }
    }
}
