/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::path::PathBuf;
use std::time::Duration;

use gridslice::Grid;
use gridsort::Comparison;
use gridsort::SortConfig;
use gridsort::input::random_input;
use gridsort::sort_local;

#[derive(clap::Args, Debug)]
pub struct SortCommand {
    /// Load configuration from this YAML file instead of the environment.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Side of the square process grid.
    #[arg(long, short = 'g')]
    grid_side: Option<usize>,

    /// Characters to sort. Random alphanumeric input is generated when
    /// omitted.
    #[arg(long, short = 'i')]
    input: Option<String>,

    /// Length of each process's fragment of generated input.
    #[arg(long, default_value_t = 36)]
    fragment_len: usize,

    /// Seed for generated input.
    #[arg(long)]
    seed: Option<u64>,

    /// Rank comparison: at-most (<=) or below (<).
    #[arg(long)]
    comparison: Option<Comparison>,

    /// Largest message body, in bytes.
    #[arg(long)]
    max_payload_len: Option<usize>,

    /// Milliseconds a blocking operation may wait before failing.
    #[arg(long)]
    stall_timeout_ms: Option<u64>,

    /// Check the result against a sequential sort.
    #[arg(long)]
    verify: bool,

    /// Print each process's stage timings.
    #[arg(long)]
    timings: bool,
}

impl SortCommand {
    fn config(&self) -> anyhow::Result<SortConfig> {
        let mut config = match &self.config {
            Some(path) => SortConfig::from_yaml(path)?,
            None => SortConfig::from_env(),
        };
        if let Some(side) = self.grid_side {
            config.grid_side = side;
        }
        if let Some(comparison) = self.comparison {
            config.comparison = comparison;
        }
        if let Some(len) = self.max_payload_len {
            config.comm = config.comm.with_max_payload_len(len);
        }
        if let Some(ms) = self.stall_timeout_ms {
            config.comm = config.comm.with_stall_timeout(Duration::from_millis(ms));
        }
        Ok(config)
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.config()?;
        let input: Vec<char> = match &self.input {
            Some(input) => input.chars().collect(),
            None => {
                let processes = Grid::new(config.grid_side)?.size();
                let len = processes.checked_mul(self.fragment_len).ok_or_else(|| {
                    anyhow::anyhow!(
                        "{} fragments of {} elements overflow the input length",
                        processes,
                        self.fragment_len
                    )
                })?;
                random_input(len, self.seed)
            }
        };

        let run = sort_local(&config, &input).await?;
        let sorted = run
            .sorted()
            .ok_or_else(|| anyhow::anyhow!("no process produced a result"))?;
        println!("input:  {}", input.iter().collect::<String>());
        println!("sorted: {}", sorted.iter().collect::<String>());

        if self.timings {
            for outcome in &run.outcomes {
                let report = outcome.report();
                let t = report.timings;
                println!(
                    "rank {:>3}: gossip {:?}, broadcast {:?}, rank {:?}, reduce {:?}, total {:?}",
                    report.rank,
                    t.gossip,
                    t.broadcast,
                    t.rank,
                    t.reduce,
                    t.total()
                );
            }
        }

        if self.verify {
            let mut expected = input.clone();
            expected.sort();
            anyhow::ensure!(
                sorted == expected.as_slice(),
                "grid sort disagrees with sequential sort"
            );
            println!("verified against sequential sort");
        }
        Ok(())
    }
}
