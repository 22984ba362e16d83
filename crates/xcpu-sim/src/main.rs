//! `xsim` binary entry point.

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde_json as _;
#[cfg(test)]
use tempfile as _;
use tracing as _;
use tracing_subscriber as _;
use xcpu_core::Console;
use xcpu_sim::{all_graceful, init_tracing, render_json, render_text, run, Cli};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let console = Console::stdio();
    let reports = run(&cli, &console)?;
    console.flush().context("failed to flush program output")?;

    let rendered = if cli.json {
        let mut json = render_json(&reports).context("failed to encode reports")?;
        json.push('\n');
        json
    } else {
        format!("\n{}", render_text(&reports))
    };
    std::io::stdout()
        .lock()
        .write_all(rendered.as_bytes())
        .context("failed to write reports")?;

    Ok(if all_graceful(&reports) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
