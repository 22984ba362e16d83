//! Command-line front end for the XCPU machine.
//!
//! `xsim <cycles> <image> [interrupt-period] [cpus]` loads a program image,
//! runs one execution loop per CPU against shared memory and reports how
//! each CPU stopped.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;
use xcpu_core::{ContextReport, Machine, MachineConfig, OutputSink};

#[cfg(test)]
use tempfile as _;

/// Parsed simulator invocation.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "xsim", about = "Run an XCPU program image on one or more CPUs")]
pub struct Cli {
    /// Cycle budget per CPU (0 runs until every CPU halts)
    pub cycles: u64,

    /// Program image loaded at address 0
    pub image: PathBuf,

    /// Timer interrupt period in cycles (0 disables the timer)
    #[arg(default_value_t = 0)]
    pub interrupt_period: u64,

    /// Number of CPUs sharing memory
    #[arg(default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub cpus: u16,

    /// Print the per-CPU reports as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Raise log verbosity on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Machine parameters selected by the positional arguments.
    #[must_use]
    pub const fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            cycle_budget: self.cycles,
            interrupt_period: self.interrupt_period,
            cpu_count: self.cpus,
        }
    }
}

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins over the `-v` count when set.
pub fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Builds the machine, loads the image and runs every CPU to completion.
///
/// # Errors
///
/// Fails when the configuration is rejected or the image cannot be loaded;
/// no CPU runs in either case.
pub fn run(cli: &Cli, console: &dyn OutputSink) -> anyhow::Result<Vec<ContextReport>> {
    let machine = Machine::new(cli.machine_config()).context("invalid machine configuration")?;
    let loaded = machine
        .load_image_file(&cli.image)
        .with_context(|| format!("failed to load {}", cli.image.display()))?;
    tracing::info!(bytes = loaded, cpus = cli.cpus, "image loaded");

    Ok(machine.run(console))
}

/// One line per CPU, in CPU order.
#[must_use]
pub fn render_text(reports: &[ContextReport]) -> String {
    reports
        .iter()
        .map(|report| format!("<{report}>\n"))
        .collect()
}

/// Reports as a pretty-printed JSON array.
///
/// # Errors
///
/// Propagates serializer failures.
pub fn render_json(reports: &[ContextReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

/// `true` when every CPU halted or ran out of cycles.
#[must_use]
pub fn all_graceful(reports: &[ContextReport]) -> bool {
    reports.iter().all(|report| report.exit.is_graceful())
}
