/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::{read_network, write_outcome};
use anyhow::{ensure, Result};
use clap::Parser;
use dsi_progress_logger::prelude::*;
use std::path::PathBuf;
use tempnet_algo::rte::{is_a_viable_schedule, RealTimeExecutor, Strategy};
use tempnet_algo::CstnuChecker;

#[derive(Parser, Debug)]
#[command(name = "rte", about = "Executes a dispatchable STNU in real time.", long_about = None)]
pub struct CliArgs {
    /// The network to execute, in GraphML format.
    pub input: PathBuf,

    #[arg(short = 'o', long)]
    /// Where to write the schedule; standard output if absent.
    pub output: Option<PathBuf>,

    #[arg(long, default_value = "early")]
    /// The controller strategy (early, middle, late, random,
    /// first-node-early, first-node-middle, first-node-late).
    pub controller: Strategy,

    #[arg(long, default_value = "random")]
    /// The environment strategy.
    pub environment: Strategy,

    #[arg(long, default_value_t = 0x5eed)]
    /// The seed of the random strategies.
    pub seed: u64,
}

pub fn main(args: CliArgs) -> Result<()> {
    // Refuse to execute a network that is not controllable to begin with.
    let graph = read_network(&args.input)?;
    let mut checker = CstnuChecker::new(graph.clone());
    let mut pl = ProgressLogger::default();
    let status = checker.dynamic_controllability_check(&mut pl)?;
    ensure!(
        status.consistency && status.finished,
        "the network is not dynamically controllable; nothing to execute"
    );

    let mut rte = RealTimeExecutor::with_seed(graph, args.controller, args.environment, args.seed);
    let result = rte.execute()?;
    assert!(
        is_a_viable_schedule(rte.graph(), &result),
        "the execution produced a non-viable schedule"
    );
    write_outcome(args.output.as_deref(), &result.to_string(), None)
}
