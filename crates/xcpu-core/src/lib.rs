//! Execution core for the XCPU 16-bit multiprocessor architecture.

/// Shared wraparound memory, the atomic-instruction lock and image loading.
pub mod memory;
pub use memory::{
    wrap_address, AtomicSection, LoadError, SharedMemory, ADDRESS_SPACE_BYTES, WORD_BYTES,
};

/// Per-context register file and run-termination reasons.
pub mod state;
pub use state::{
    CpuContext, ExitReason, GeneralRegister, GENERAL_REGISTER_COUNT, STATE_CONDITION, STATE_DEBUG,
    STATE_IN_EXCEPTION,
};

/// Opcode assignments and operand-class encoding.
pub mod encoding;
pub use encoding::{
    classify_opcode, split_instruction_word, Opcode, OperandClass, OPCODE_ENCODING_TABLE,
};

/// Instruction word decoding.
pub mod decoder;
pub use decoder::{AddressingMode, DecodedInstruction, Decoder, Operands};

/// Exception kinds, delivery errors and fault codes.
pub mod fault;
pub use fault::{ExceptionError, ExceptionKind, FaultCode};

/// Exception entry and return.
pub mod exception;
pub use exception::{raise_exception, raise_exception_ordinal, return_from_exception};

/// Host-facing configuration, output and report contracts.
pub mod api;
pub use api::{Bus, ConfigError, ContextReport, MachineConfig, OutputSink, StepOutcome};

/// Console sinks for program output and debug dumps.
pub mod console;
pub use console::{CaptureConsole, Console};

/// Dispatch table and the fetch-decode-execute cycle.
pub mod execute;
pub use execute::{step_one, DispatchTable, Handler, DISPATCH_TABLE_LEN};

/// Per-context execution loops and the multiprocessor machine.
pub mod runner;
pub use runner::{run_context, Machine};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
