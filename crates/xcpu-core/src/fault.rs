use thiserror::Error;

/// Exception kinds, ordered as the entries of the vector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u16)]
pub enum ExceptionKind {
    /// Externally injected (periodic timer) interrupt.
    Interrupt = 0,
    /// Software trap raised by the `trap` instruction.
    Trap = 1,
    /// Internal fault raised by an instruction (division by zero).
    Fault = 2,
}

impl ExceptionKind {
    /// Number of defined exception kinds.
    pub const COUNT: u16 = 3;

    /// Returns the vector-table ordinal of this kind.
    #[must_use]
    pub const fn ordinal(self) -> u16 {
        self as u16
    }

    /// Byte offset of this kind's handler address within the vector table.
    #[must_use]
    pub const fn vector_offset(self) -> u16 {
        self.ordinal() * 2
    }

    /// Converts a raw ordinal back into a kind.
    #[must_use]
    pub const fn from_ordinal(ordinal: u16) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Interrupt),
            1 => Some(Self::Trap),
            2 => Some(Self::Fault),
            _ => None,
        }
    }
}

/// Reasons an exception could not be delivered to a context.
///
/// A refused delivery leaves registers, `pc`, `state` and memory untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExceptionError {
    /// The context is already handling an exception (`state` bit 2 set).
    #[error("context is already handling an exception")]
    AlreadyInException,
    /// The interrupt table register is zero.
    #[error("no interrupt vector table is installed")]
    NoVectorTable,
    /// The requested ordinal does not name an exception kind.
    #[error("exception kind {0} is out of range")]
    InvalidKind(u16),
}

/// Faults that terminate the faulting context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// `div` with a zero divisor and no way to deliver a fault exception.
    #[error("division by zero")]
    DivideByZero = 0x01,
}

impl FaultCode {
    /// Converts a fault code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::DivideByZero),
            _ => None,
        }
    }

    /// Exception kind that guest code sees for this fault when a handler exists.
    #[must_use]
    pub const fn exception_kind(self) -> ExceptionKind {
        match self {
            Self::DivideByZero => ExceptionKind::Fault,
        }
    }
}
