/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::{read_network, write_outcome, CheckArgs};
use anyhow::Result;
use clap::Parser;
use dsi_progress_logger::prelude::*;
use tempnet_algo::{CstnChecker, PotentialSolver, Semantics};

#[derive(Parser, Debug)]
#[command(name = "cstn", about = "Checks the dynamic consistency of a CSTN.", long_about = None)]
pub struct CliArgs {
    #[clap(flatten)]
    pub check: CheckArgs,

    #[arg(long, default_value_t = false)]
    /// Use the potential-based solver instead of the rule-based fixed point.
    pub potential: bool,
}

pub fn main(args: CliArgs) -> Result<()> {
    let graph = read_network(&args.check.input)?;
    let mut pl = ProgressLogger::default();
    pl.item_name("edge");

    if args.potential {
        let mut solver = PotentialSolver::new(graph);
        solver.set_timeout(args.check.timeout_duration());
        solver.dynamic_consistency_check(&mut pl)?;
        let report = solver.status().to_string();
        let graph = solver.into_graph();
        write_outcome(
            args.check.output.as_deref(),
            &report,
            args.check.cleaned.then_some(&graph),
        )
    } else {
        let semantics = Semantics {
            propagation_only_to_z: args.check.only_to_z,
            ..Semantics::default()
        };
        let mut checker = CstnChecker::with_semantics(graph, semantics);
        checker.set_timeout(args.check.timeout_duration());
        checker.dynamic_consistency_check(&mut pl)?;
        let report = checker.status().to_string();
        if args.check.cleaned {
            checker.clean_graph();
        }
        let graph = checker.into_graph();
        write_outcome(
            args.check.output.as_deref(),
            &report,
            args.check.cleaned.then_some(&graph),
        )
    }
}
