use std::fmt;

/// Number of architecturally visible general-purpose registers (`r0..r15`).
pub const GENERAL_REGISTER_COUNT: usize = 16;
/// `state` bit holding the last comparison result.
pub const STATE_CONDITION: u16 = 1 << 0;
/// `state` bit for debug mode.
pub const STATE_DEBUG: u16 = 1 << 1;
/// `state` bit set while the context is handling an exception.
pub const STATE_IN_EXCEPTION: u16 = 1 << 2;

/// Architecturally visible general-purpose register identifier.
///
/// `R15` doubles as the stack pointer. Nothing prevents ordinary instructions
/// from using it as a scratch register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum GeneralRegister {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl GeneralRegister {
    /// Stack pointer alias.
    pub const SP: Self = Self::R15;

    /// Ordered list of all architectural general-purpose registers.
    pub const ALL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::R13,
        Self::R14,
        Self::R15,
    ];

    /// Returns the array index for this register (`0..=15`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes the low nibble of `bits` into a register. Upper bits are ignored.
    #[must_use]
    pub const fn from_nibble(bits: u8) -> Self {
        Self::ALL[(bits & 0x0F) as usize]
    }
}

/// Per-CPU register file and control registers.
///
/// A context is owned by exactly one execution loop; only the memory it runs
/// against is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuContext {
    regs: [u16; GENERAL_REGISTER_COUNT],
    pc: u16,
    state: u16,
    itr: u16,
    id: u16,
    cpu_count: u16,
}

impl Default for CpuContext {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl CpuContext {
    /// Creates a zeroed context with its CPU id and the total CPU count.
    #[must_use]
    pub const fn new(id: u16, cpu_count: u16) -> Self {
        Self {
            regs: [0; GENERAL_REGISTER_COUNT],
            pc: 0,
            state: 0,
            itr: 0,
            id,
            cpu_count,
        }
    }

    /// Reads a general-purpose register.
    #[must_use]
    pub const fn reg(&self, reg: GeneralRegister) -> u16 {
        self.regs[reg.index()]
    }

    /// Writes a general-purpose register.
    pub const fn set_reg(&mut self, reg: GeneralRegister, value: u16) {
        self.regs[reg.index()] = value;
    }

    /// Returns the whole register file in index order.
    #[must_use]
    pub const fn regs(&self) -> &[u16; GENERAL_REGISTER_COUNT] {
        &self.regs
    }

    /// Reads the stack pointer (`r15`).
    #[must_use]
    pub const fn sp(&self) -> u16 {
        self.reg(GeneralRegister::SP)
    }

    /// Writes the stack pointer (`r15`).
    pub const fn set_sp(&mut self, value: u16) {
        self.set_reg(GeneralRegister::SP, value);
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    /// Reads the `state` register.
    #[must_use]
    pub const fn state(&self) -> u16 {
        self.state
    }

    /// Writes the whole `state` register.
    pub const fn set_state(&mut self, value: u16) {
        self.state = value;
    }

    /// Returns `true` when a specific `state` bit is set.
    #[must_use]
    pub const fn flag_is_set(&self, flag: u16) -> bool {
        (self.state & flag) != 0
    }

    /// Sets or clears a specific `state` bit.
    pub const fn set_flag(&mut self, flag: u16, enabled: bool) {
        if enabled {
            self.state |= flag;
        } else {
            self.state &= !flag;
        }
    }

    /// Condition bit written by `test`/`cmp`/`equ` and read by `br`.
    #[must_use]
    pub const fn condition(&self) -> bool {
        self.flag_is_set(STATE_CONDITION)
    }

    /// Whether debug mode is on.
    #[must_use]
    pub const fn debug_enabled(&self) -> bool {
        self.flag_is_set(STATE_DEBUG)
    }

    /// Whether the context is currently handling an exception.
    #[must_use]
    pub const fn in_exception(&self) -> bool {
        self.flag_is_set(STATE_IN_EXCEPTION)
    }

    /// Reads the interrupt table register.
    #[must_use]
    pub const fn itr(&self) -> u16 {
        self.itr
    }

    /// Writes the interrupt table register. Zero uninstalls the table.
    pub const fn set_itr(&mut self, value: u16) {
        self.itr = value;
    }

    /// Zero-based CPU identifier.
    #[must_use]
    pub const fn id(&self) -> u16 {
        self.id
    }

    /// Number of contexts sharing this context's memory.
    #[must_use]
    pub const fn cpu_count(&self) -> u16 {
        self.cpu_count
    }
}

/// Legacy register dump emitted while debug mode is on.
impl fmt::Display for CpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PC: {:04x}, State: {:04x}: Registers:", self.pc, self.state)?;
        for value in &self.regs {
            write!(f, " {value:04x}")?;
        }
        writeln!(f)
    }
}
