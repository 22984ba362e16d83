//! End-to-end runs through the simulator front end.

#![allow(clippy::pedantic, clippy::nursery)]

use std::io::Write;

use anyhow as _;
use clap::Parser;
use tracing as _;
use tracing_subscriber as _;
use xcpu_core::CaptureConsole;
use xcpu_sim::{all_graceful, render_json, render_text, run, Cli};

fn image_file(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(bytes).expect("write image");
    file
}

fn cli(args: &[&str], image: &tempfile::NamedTempFile) -> Cli {
    let path = image.path().to_str().expect("utf8 path").to_owned();
    let mut argv = vec!["xsim".to_owned(), args[0].to_owned(), path];
    argv.extend(args[1..].iter().map(|arg| (*arg).to_owned()));
    Cli::try_parse_from(argv).expect("parse")
}

#[test]
fn add_program_prints_result_and_halt_report() {
    let image = image_file(&[
        0xE1, 0x00, 0x00, 0x05, 0xE1, 0x10, 0x00, 0x03, 0x81, 0x10, 0x47, 0x00, 0x00, 0x00,
    ]);
    let console = CaptureConsole::new();

    let reports = run(&cli(&["0"], &image), &console).expect("run");

    assert_eq!(console.output_bytes(), vec![8]);
    assert_eq!(
        render_text(&reports),
        "<CPU 0 has halted after 4 cycles at PC = 000c : 0000>\n"
    );
    assert!(all_graceful(&reports));
}

#[test]
fn cycle_budget_reports_out_of_time_for_every_cpu() {
    // jr -2
    let image = image_file(&[0x62, 0xFE]);
    let reports = run(&cli(&["10", "0", "2"], &image), &CaptureConsole::new()).expect("run");

    assert_eq!(
        render_text(&reports),
        "<CPU 0 ran out of time after 10 cycles at PC = 0000 : 62fe>\n\
         <CPU 1 ran out of time after 10 cycles at PC = 0000 : 62fe>\n"
    );
    assert!(all_graceful(&reports));
}

#[test]
fn failed_timer_interrupt_is_not_graceful() {
    let image = image_file(&[0x62, 0xFE]);
    let reports = run(&cli(&["0", "5"], &image), &CaptureConsole::new()).expect("run");

    assert_eq!(
        render_text(&reports),
        "<CPU 0 exception error at PC = 0000; halted after 5 cycles>\n"
    );
    assert!(!all_graceful(&reports));
}

#[test]
fn json_reports_carry_exit_reason_and_registers() {
    // cpuid r1; bad
    let image = image_file(&[0x4B, 0x10, 0x00, 0x00]);
    let reports = run(&cli(&["0", "0", "3"], &image), &CaptureConsole::new()).expect("run");

    let json = render_json(&reports).expect("json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let entries = value.as_array().expect("array");

    assert_eq!(entries.len(), 3);
    for (id, entry) in entries.iter().enumerate() {
        assert_eq!(entry["cpu_id"], id);
        assert_eq!(entry["exit"], "Halted");
        assert_eq!(entry["cycles"], 1);
        assert_eq!(entry["last_pc"], 2);
        assert_eq!(entry["context"]["regs"][1], id);
    }
}

#[test]
fn missing_image_fails_before_running() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.xo");
    let cli = Cli::try_parse_from(["xsim", "0", path.to_str().expect("utf8 path")]).expect("parse");

    let err = run(&cli, &CaptureConsole::new()).expect_err("missing image");
    let message = format!("{err:#}");

    assert!(message.contains("failed to load"));
    assert!(message.contains("absent.xo"));
}

#[test]
fn oversized_image_is_fatal() {
    let image = image_file(&vec![0_u8; 0x1_0001]);
    let err = run(&cli(&["0"], &image), &CaptureConsole::new()).expect_err("too large");

    assert!(format!("{err:#}").contains("too big to fit in memory"));
}
