/*
 * SPDX-FileCopyrightText: 2025 The tempnet developers
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unconditional_recursion)]
#![deny(unreachable_patterns)]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempnet::graph::TNGraph;
use tempnet::io::read_graphml;

pub mod cstn;
pub mod cstnu;
pub mod ostnu;
pub mod rte;

pub mod build_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));

    pub fn version_string() -> String {
        format!(
            "{}\ngit info: {} {}\nbuild info: built for {} with {}",
            PKG_VERSION,
            GIT_VERSION.unwrap_or(""),
            GIT_COMMIT_HASH.unwrap_or(""),
            TARGET,
            RUSTC_VERSION
        )
    }
}

/// Initializes the logger from the environment, defaulting to `info`.
pub fn init_env_logger() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init()?;
    Ok(())
}

/// Arguments shared by every checking subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// The network to check, in GraphML format.
    pub input: PathBuf,

    #[arg(short = 'o', long)]
    /// Where to write the outcome; standard output if absent.
    pub output: Option<PathBuf>,

    #[arg(short = 't', long = "timeOut", default_value_t = 900)]
    /// The timeout of the check, in seconds.
    pub timeout: u64,

    #[arg(long = "onlyToZ", default_value_t = false)]
    /// Propagate only toward the zero time-point (faster on consistent
    /// instances, less informative).
    pub only_to_z: bool,

    #[arg(long, default_value_t = false)]
    /// Also emit the checked network, simplified and without
    /// initialization scaffolding.
    pub cleaned: bool,
}

impl CheckArgs {
    pub fn timeout_duration(&self) -> Option<Duration> {
        (self.timeout != 0).then(|| Duration::from_secs(self.timeout))
    }
}

/// Reads the input network of a subcommand.
pub fn read_network(path: &Path) -> Result<TNGraph> {
    let xml = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read the network at {}", path.display()))?;
    read_graphml(&xml).with_context(|| format!("Could not parse the network at {}", path.display()))
}

/// Writes `report` (and, if requested, the cleaned graph) to the chosen
/// output.
pub fn write_outcome(
    output: Option<&Path>,
    report: &str,
    cleaned: Option<&TNGraph>,
) -> Result<()> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Could not create the output at {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    };
    writer.write_all(report.as_bytes())?;
    if let Some(graph) = cleaned {
        writeln!(writer)?;
        tempnet::io::write_graphml(graph, &mut writer)?;
        writeln!(writer)?;
    }
    Ok(())
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    /// Checks the dynamic consistency of a CSTN.
    Cstn(cstn::CliArgs),
    /// Checks the dynamic controllability of a CSTNU.
    Cstnu(cstnu::CliArgs),
    /// Checks the agile controllability of an OSTNU.
    Ostnu(ostnu::CliArgs),
    /// Executes a dispatchable STNU in real time.
    Rte(rte::CliArgs),
}

#[derive(Parser, Debug)]
#[command(
    name = "tempnet",
    version = build_info::version_string(),
    disable_version_flag = true,
    propagate_version = true
)]
/// Consistency and controllability checkers for temporal networks.
pub struct Cli {
    #[command(subcommand)]
    pub command: SubCommands,

    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version, global = true)]
    version: Option<bool>,
}

pub fn cli_main<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let start = std::time::Instant::now();
    let cli = Cli::parse_from(args);
    match cli.command {
        SubCommands::Cstn(args) => cstn::main(args)?,
        SubCommands::Cstnu(args) => cstnu::main(args)?,
        SubCommands::Ostnu(args) => ostnu::main(args)?,
        SubCommands::Rte(args) => rte::main(args)?,
    }
    log::info!("The command took {:.3} s", start.elapsed().as_secs_f64());
    Ok(())
}
