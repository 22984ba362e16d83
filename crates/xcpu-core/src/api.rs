//! Host-facing API contracts for embedding the XCPU core.

use std::fmt;

use thiserror::Error;

use crate::memory::SharedMemory;
use crate::state::{CpuContext, ExitReason};
use crate::FaultCode;

/// Immutable configuration shared by every context of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineConfig {
    /// Completed-cycle limit per context; `0` runs until halt.
    pub cycle_budget: u64,
    /// Timer interrupt period in completed cycles; `0` disables the timer.
    pub interrupt_period: u64,
    /// Number of contexts sharing the memory.
    pub cpu_count: u16,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            cycle_budget: 0,
            interrupt_period: 0,
            cpu_count: 1,
        }
    }
}

impl MachineConfig {
    /// Checks the configuration before any context starts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoCpus`] when `cpu_count` is zero.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.cpu_count == 0 {
            return Err(ConfigError::NoCpus);
        }
        Ok(())
    }

    /// Whether the cycle budget is used up after `completed` cycles.
    #[must_use]
    pub const fn budget_exhausted(&self, completed: u64) -> bool {
        self.cycle_budget != 0 && completed >= self.cycle_budget
    }

    /// Whether a timer interrupt is due before the next cycle.
    #[must_use]
    pub const fn interrupt_due(&self, completed: u64) -> bool {
        completed != 0
            && self.interrupt_period != 0
            && completed.is_multiple_of(self.interrupt_period)
    }
}

/// Rejected machine configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// At least one CPU context is required.
    #[error("at least one CPU is required")]
    NoCpus,
}

/// Result of one fetch-decode-execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The instruction completed and the context keeps running.
    Retired,
    /// The fetched opcode halts the context.
    Halted,
    /// The instruction faulted and no handler could take the fault.
    Fault {
        /// Fault code.
        cause: FaultCode,
    },
}

/// Serialised sink for the `out` instruction and debug-mode dumps.
///
/// Shared by every context, so implementations serialise writes per stream.
pub trait OutputSink: Sync {
    /// Emits one byte on the program output stream.
    fn emit(&self, byte: u8);

    /// Writes a register dump of `ctx` on the debug stream.
    fn debug_dump(&self, ctx: &CpuContext);
}

/// Everything outside the register file that an instruction can touch.
#[derive(Clone, Copy)]
pub struct Bus<'a> {
    /// Memory shared by all contexts.
    pub memory: &'a SharedMemory,
    /// Output channel shared by all contexts.
    pub output: &'a dyn OutputSink,
}

impl<'a> Bus<'a> {
    /// Bundles shared memory with an output sink.
    #[must_use]
    pub fn new(memory: &'a SharedMemory, output: &'a dyn OutputSink) -> Self {
        Self { memory, output }
    }
}

impl fmt::Debug for Bus<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

/// Final report of one context's execution loop.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ContextReport {
    /// CPU identifier.
    pub cpu_id: u16,
    /// Why the loop stopped.
    pub exit: ExitReason,
    /// Instructions retired without halting.
    pub cycles: u64,
    /// Address of the last fetched instruction.
    pub last_pc: u16,
    /// Word stored at `last_pc` when the loop stopped.
    pub last_word: u16,
    /// Context registers at the moment the loop stopped.
    pub context: CpuContext,
}

impl fmt::Display for ContextReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            cpu_id,
            cycles,
            last_pc,
            last_word,
            ..
        } = self;
        match self.exit {
            ExitReason::Halted => write!(
                f,
                "CPU {cpu_id} has halted after {cycles} cycles at PC = {last_pc:04x} : {last_word:04x}"
            ),
            ExitReason::OutOfCycles => write!(
                f,
                "CPU {cpu_id} ran out of time after {cycles} cycles at PC = {last_pc:04x} : {last_word:04x}"
            ),
            ExitReason::ExceptionDelivery(_) => write!(
                f,
                "CPU {cpu_id} exception error at PC = {:04x}; halted after {cycles} cycles",
                self.context.pc()
            ),
            ExitReason::Fault(cause) => write!(
                f,
                "CPU {cpu_id} faulted ({cause}) after {cycles} cycles at PC = {last_pc:04x} : {last_word:04x}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExceptionError;

    fn report(exit: ExitReason) -> ContextReport {
        let mut context = CpuContext::new(2, 4);
        context.set_pc(0x0102);
        ContextReport {
            cpu_id: 2,
            exit,
            cycles: 17,
            last_pc: 0x00FE,
            last_word: 0x0000,
            context,
        }
    }

    #[test]
    fn default_config_runs_one_cpu_without_limits() {
        let config = MachineConfig::default();
        assert_eq!(config.cpu_count, 1);
        assert!(config.validate().is_ok());
        assert!(!config.budget_exhausted(u64::MAX));
        assert!(!config.interrupt_due(10));
    }

    #[test]
    fn zero_cpus_is_rejected() {
        let config = MachineConfig {
            cpu_count: 0,
            ..MachineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoCpus));
    }

    #[test]
    fn budget_and_timer_use_completed_cycles() {
        let config = MachineConfig {
            cycle_budget: 10,
            interrupt_period: 4,
            cpu_count: 1,
        };
        assert!(!config.budget_exhausted(9));
        assert!(config.budget_exhausted(10));
        assert!(!config.interrupt_due(0));
        assert!(!config.interrupt_due(3));
        assert!(config.interrupt_due(4));
        assert!(config.interrupt_due(8));
    }

    #[test]
    fn reports_render_like_the_simulator_console() {
        assert_eq!(
            report(ExitReason::Halted).to_string(),
            "CPU 2 has halted after 17 cycles at PC = 00fe : 0000"
        );
        assert_eq!(
            report(ExitReason::OutOfCycles).to_string(),
            "CPU 2 ran out of time after 17 cycles at PC = 00fe : 0000"
        );
        assert_eq!(
            report(ExitReason::ExceptionDelivery(ExceptionError::NoVectorTable)).to_string(),
            "CPU 2 exception error at PC = 0102; halted after 17 cycles"
        );
        assert_eq!(
            report(ExitReason::Fault(FaultCode::DivideByZero)).to_string(),
            "CPU 2 faulted (division by zero) after 17 cycles at PC = 00fe : 0000"
        );
    }
}
