#![no_main]

use libfuzzer_sys::fuzz_target;
use xcpu_core::{CaptureConsole, Decoder, Machine, MachineConfig};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let _ = Decoder::decode(u16::from_be_bytes([data[0], data[1]]));

    // Third byte picks the CPU count and timer period; the rest is the image.
    let selector = data[2];
    let config = MachineConfig {
        cycle_budget: 2_000,
        interrupt_period: u64::from(selector >> 4),
        cpu_count: u16::from(selector & 0x03) + 1,
    };
    let Ok(machine) = Machine::new(config) else {
        return;
    };
    if machine.load_image(&data[3..]).is_err() {
        return;
    }

    let reports = machine.run(&CaptureConsole::new());
    assert_eq!(reports.len(), usize::from(config.cpu_count));
    for report in &reports {
        assert!(report.cycles <= config.cycle_budget);
    }
});
