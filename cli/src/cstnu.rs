/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::{read_network, write_outcome, CheckArgs};
use anyhow::Result;
use clap::Parser;
use dsi_progress_logger::prelude::*;
use tempnet_algo::{CstnuChecker, Semantics};

#[derive(Parser, Debug)]
#[command(name = "cstnu", about = "Checks the dynamic controllability of a CSTNU.", long_about = None)]
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
    let mut checker = CstnuChecker::with_semantics(graph, semantics);
    checker.set_timeout(args.check.timeout_duration());
    let mut pl = ProgressLogger::default();
    checker.dynamic_controllability_check(&mut pl)?;
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
