/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use gridsort::cost::CostModel;

#[derive(clap::Args, Debug)]
pub struct EstimateCommand {
    /// Process counts to estimate for.
    #[arg(required = true)]
    processes: Vec<u32>,

    /// Number of elements sorted.
    #[arg(long, default_value_t = 14400.0)]
    n: f64,

    /// Per-process startup cost.
    #[arg(long, default_value_t = 5.0)]
    x: f64,

    /// Per-message latency.
    #[arg(long, default_value_t = 2.0)]
    alpha: f64,

    /// Bandwidth.
    #[arg(long, default_value_t = 3.0)]
    beta: f64,
}

impl EstimateCommand {
    pub fn run(self) -> anyhow::Result<()> {
        let model = CostModel {
            n: self.n,
            x: self.x,
            alpha: self.alpha,
            beta: self.beta,
        };
        println!("{:>8} {:>16} {:>16}", "p", "T_impl", "T_ideal");
        for p in self.processes {
            anyhow::ensure!(p > 0, "process count must be positive");
            let estimate = model.estimate(f64::from(p));
            println!(
                "{:>8} {:>16.4} {:>16.4}",
                p, estimate.implemented, estimate.ideal
            );
        }
        Ok(())
    }
}
