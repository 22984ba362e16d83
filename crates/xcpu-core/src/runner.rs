//! Multiprocessor execution: one fetch-execute loop per context, all sharing
//! one memory segment.

use std::panic;
use std::path::Path;
use std::thread;

use crate::api::{Bus, ConfigError, ContextReport, MachineConfig, OutputSink, StepOutcome};
use crate::exception::raise_exception;
use crate::execute::{step_one, DispatchTable};
use crate::memory::{LoadError, SharedMemory};
use crate::state::{CpuContext, ExitReason};
use crate::ExceptionKind;

/// Runs one context until it halts, faults, fails a timer interrupt or uses
/// up its cycle budget.
///
/// Only retired instructions count as completed cycles; the halting fetch
/// does not.
pub fn run_context(
    mut ctx: CpuContext,
    bus: &Bus<'_>,
    config: &MachineConfig,
    table: &DispatchTable,
) -> ContextReport {
    let mut completed: u64 = 0;
    let mut last_pc = ctx.pc();

    let exit = loop {
        if config.budget_exhausted(completed) {
            break ExitReason::OutOfCycles;
        }
        if config.interrupt_due(completed) {
            if let Err(err) = raise_exception(&mut ctx, bus.memory, ExceptionKind::Interrupt) {
                break ExitReason::ExceptionDelivery(err);
            }
        }

        last_pc = ctx.pc();
        match step_one(&mut ctx, bus, table) {
            StepOutcome::Retired => completed += 1,
            StepOutcome::Halted => break ExitReason::Halted,
            StepOutcome::Fault { cause } => break ExitReason::Fault(cause),
        }
    };

    tracing::info!(cpu = ctx.id(), ?exit, cycles = completed, last_pc, "context stopped");

    ContextReport {
        cpu_id: ctx.id(),
        exit,
        cycles: completed,
        last_pc,
        last_word: bus.memory.read_u16_be(last_pc),
        context: ctx,
    }
}

/// A configured machine: shared memory plus the parameters of a run.
#[derive(Debug)]
pub struct Machine {
    config: MachineConfig,
    memory: SharedMemory,
}

impl Machine {
    /// Creates a machine with zero-filled memory.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] reported by [`MachineConfig::validate`].
    pub fn new(config: MachineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            memory: SharedMemory::new(),
        })
    }

    /// Run parameters.
    #[must_use]
    pub const fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Memory shared by every context.
    #[must_use]
    pub const fn memory(&self) -> &SharedMemory {
        &self.memory
    }

    /// Copies a program image to address 0.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::ImageTooLarge`] for images over 64 KiB.
    pub fn load_image(&self, image: &[u8]) -> Result<usize, LoadError> {
        self.memory.load_image(image)
    }

    /// Loads a program image file to address 0.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] when the file cannot be read or does not fit.
    pub fn load_image_file(&self, path: impl AsRef<Path>) -> Result<usize, LoadError> {
        self.memory.load_image_file(path)
    }

    /// Starts every context on its own thread and waits for all of them.
    ///
    /// Reports come back ordered by CPU id. A panic on a context thread is
    /// propagated to the caller after the other contexts finish.
    pub fn run(&self, output: &dyn OutputSink) -> Vec<ContextReport> {
        let bus = Bus::new(&self.memory, output);
        let config = &self.config;
        let table = DispatchTable::shared();

        tracing::debug!(
            cpus = config.cpu_count,
            budget = config.cycle_budget,
            interrupt_period = config.interrupt_period,
            "starting contexts"
        );

        thread::scope(|scope| {
            // Collect first so every context is spawned before the first join.
            #[allow(clippy::needless_collect)]
            let handles: Vec<_> = (0..config.cpu_count)
                .map(|id| {
                    let ctx = CpuContext::new(id, config.cpu_count);
                    scope.spawn(move || run_context(ctx, &bus, config, table))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
                .collect()
        })
    }
}
