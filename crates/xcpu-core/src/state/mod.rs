//! Per-context CPU state model primitives.

/// Register file, control registers and `state` bit layout.
pub mod registers;
/// Execution-loop termination reasons.
pub mod run_state;

pub use registers::{
    CpuContext, GeneralRegister, GENERAL_REGISTER_COUNT, STATE_CONDITION, STATE_DEBUG,
    STATE_IN_EXCEPTION,
};
pub use run_state::ExitReason;
