use crate::{ExceptionError, FaultCode};

/// Why an execution loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExitReason {
    /// The context fetched an unmapped opcode.
    Halted,
    /// The cycle budget ran out before the context halted.
    OutOfCycles,
    /// A periodic timer interrupt could not be delivered.
    ExceptionDelivery(ExceptionError),
    /// An instruction faulted and the fault could not be vectored.
    Fault(FaultCode),
}

impl ExitReason {
    /// Halting and running out of cycles are normal terminations.
    #[must_use]
    pub const fn is_graceful(self) -> bool {
        matches!(self, Self::Halted | Self::OutOfCycles)
    }
}
