/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

mod commands;

use clap::Parser;
use clap::Subcommand;

use crate::commands::estimate::EstimateCommand;
use crate::commands::sort::SortCommand;

#[derive(Parser)]
#[command(about = "Distributed counting sort on a square process grid")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[clap(about = r#"Sort input on an in-process grid"#)]
    Sort(SortCommand),

    #[clap(about = r#"Estimate costs with the analytic model"#)]
    Estimate(EstimateCommand),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Cli::parse();
    gridcomm::telemetry::initialize_logging();

    match args.command {
        Command::Sort(command) => command.run().await,
        Command::Estimate(command) => command.run(),
    }
}
