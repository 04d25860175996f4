/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::{read_network, write_outcome, CheckArgs};
use anyhow::Result;
use clap::Parser;
use dsi_progress_logger::prelude::*;
use tempnet_algo::{OstnuChecker, Semantics};

#[derive(Parser, Debug)]
#[command(name = "ostnu", about = "Checks the agile controllability of an OSTNU.", long_about = None)]
pub struct CliArgs {
    #[clap(flatten)]
    pub check: CheckArgs,
}

pub fn main(args: CliArgs) -> Result<()> {
    let graph = read_network(&args.check.input)?;
    let semantics = Semantics {
        propagation_only_to_z: args.check.only_to_z,
        ..Semantics::default()
    };
    let mut checker = OstnuChecker::with_semantics(graph, semantics);
    checker.set_timeout(args.check.timeout_duration());
    let mut pl = ProgressLogger::default();
    checker.agile_controllability_check(&mut pl)?;
    let mut report = checker.status().to_string();
    if !checker.negative_scenarios().is_empty() {
        report.push_str("negative scenarios:");
        for scenario in checker.negative_scenarios() {
            report.push_str(&format!(" {scenario}"));
        }
        report.push('\n');
    }
    let graph = checker.into_graph();
    write_outcome(
        args.check.output.as_deref(),
        &report,
        args.check.cleaned.then_some(&graph),
    )
}
