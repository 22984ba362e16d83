//! Instruction execution pipeline for the XCPU ISA.
//!
//! One cycle fetches the word at `pc`, decodes it, advances `pc` by one word
//! and dispatches on the opcode byte through a 256-entry handler table.

mod handlers;
pub(crate) mod helpers;

use std::fmt;
use std::sync::OnceLock;

use crate::api::{Bus, StepOutcome};
use crate::decoder::{DecodedInstruction, Decoder};
use crate::encoding::OPCODE_ENCODING_TABLE;
use crate::memory::WORD_BYTES;
use crate::state::CpuContext;

/// Number of dispatch entries, one per opcode byte.
pub const DISPATCH_TABLE_LEN: usize = 256;

/// Instruction handler signature.
///
/// `pc` already points past the instruction word when a handler runs.
pub type Handler = fn(&mut CpuContext, &Bus<'_>, &DecodedInstruction) -> StepOutcome;

/// Opcode-byte indexed handler table.
///
/// Unassigned entries hold the halting handler.
pub struct DispatchTable {
    handlers: [Handler; DISPATCH_TABLE_LEN],
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("assigned", &OPCODE_ENCODING_TABLE.len())
            .finish_non_exhaustive()
    }
}

impl DispatchTable {
    /// Builds a fresh table from the opcode encoding table.
    #[must_use]
    pub fn new() -> Self {
        let mut entries = [handlers::halt as Handler; DISPATCH_TABLE_LEN];
        for (byte, opcode, _) in OPCODE_ENCODING_TABLE {
            entries[usize::from(*byte)] = handlers::handler_for(*opcode);
        }
        Self { handlers: entries }
    }

    /// Process-wide table, built on first use and never mutated afterwards.
    #[must_use]
    pub fn shared() -> &'static Self {
        static TABLE: OnceLock<DispatchTable> = OnceLock::new();
        TABLE.get_or_init(Self::new)
    }

    /// Looks up the handler for an opcode byte.
    #[must_use]
    pub const fn handler(&self, opcode_byte: u8) -> Handler {
        self.handlers[opcode_byte as usize]
    }
}

/// Runs a single fetch-decode-execute cycle.
///
/// When debug mode is on and the instruction did not halt, the context is
/// dumped to the debug stream afterwards.
pub fn step_one(ctx: &mut CpuContext, bus: &Bus<'_>, table: &DispatchTable) -> StepOutcome {
    let pc = ctx.pc();
    let word = bus.memory.read_u16_be(pc);
    let instr = Decoder::decode(word);
    ctx.set_pc(pc.wrapping_add(WORD_BYTES));

    tracing::trace!(cpu = ctx.id(), pc, word, opcode = ?instr.opcode, "cycle");

    let outcome = table.handler(instr.opcode_byte)(ctx, bus, &instr);
    if outcome == StepOutcome::Retired && ctx.debug_enabled() {
        bus.output.debug_dump(ctx);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::CaptureConsole;
    use crate::memory::SharedMemory;
    use crate::state::{GeneralRegister, STATE_CONDITION};
    use crate::FaultCode;

    fn load_words(memory: &SharedMemory, base: u16, words: &[u16]) {
        for (offset, word) in (0_u16..).zip(words) {
            memory.write_u16_be(base.wrapping_add(offset * 2), *word);
        }
    }

    fn run_words(ctx: &mut CpuContext, words: &[u16], steps: usize) -> (SharedMemory, CaptureConsole) {
        let memory = SharedMemory::new();
        let console = CaptureConsole::new();
        load_words(&memory, ctx.pc(), words);
        {
            let bus = Bus::new(&memory, &console);
            for _ in 0..steps {
                assert_eq!(step_one(ctx, &bus, DispatchTable::shared()), StepOutcome::Retired);
            }
        }
        (memory, console)
    }

    #[test]
    fn unassigned_entries_halt() {
        let memory = SharedMemory::new();
        let console = CaptureConsole::new();
        let bus = Bus::new(&memory, &console);
        let table = DispatchTable::new();

        for word in [0x0000_u16, 0x0800, 0x95FF, 0xFFFF] {
            memory.write_u16_be(0_u16, word);
            let mut ctx = CpuContext::default();
            assert_eq!(step_one(&mut ctx, &bus, &table), StepOutcome::Halted);
            assert_eq!(ctx.pc(), 2);
        }
    }

    #[test]
    fn shared_table_is_built_once() {
        assert!(std::ptr::eq(DispatchTable::shared(), DispatchTable::shared()));
    }

    #[test]
    fn loadi_reads_trailing_word_and_skips_it() {
        let mut ctx = CpuContext::default();
        run_words(&mut ctx, &[0xE170, 0xBEEF], 1);
        assert_eq!(ctx.reg(GeneralRegister::R7), 0xBEEF);
        assert_eq!(ctx.pc(), 4);
    }

    #[test]
    fn two_register_ops_write_second_register() {
        let mut ctx = CpuContext::default();
        ctx.set_reg(GeneralRegister::R1, 3);
        ctx.set_reg(GeneralRegister::R2, 10);
        run_words(&mut ctx, &[0x8212], 1);
        assert_eq!(ctx.reg(GeneralRegister::R2), 7);
        assert_eq!(ctx.reg(GeneralRegister::R1), 3);
    }

    #[test]
    fn relative_branch_counts_from_next_instruction() {
        let mut ctx = CpuContext::default();
        ctx.set_pc(0x0010);
        run_words(&mut ctx, &[0x6204], 1);
        assert_eq!(ctx.pc(), 0x0016);
    }

    #[test]
    fn untaken_branch_falls_through() {
        let mut ctx = CpuContext::default();
        run_words(&mut ctx, &[0x6140], 1);
        assert_eq!(ctx.pc(), 2);

        let mut ctx = CpuContext::default();
        ctx.set_flag(STATE_CONDITION, true);
        run_words(&mut ctx, &[0x6140], 1);
        assert_eq!(ctx.pc(), 0x42);
    }

    #[test]
    fn out_emits_low_byte() {
        let mut ctx = CpuContext::default();
        ctx.set_reg(GeneralRegister::R3, 0x1241);
        let (_, console) = run_words(&mut ctx, &[0x4730], 1);
        assert_eq!(console.output_bytes(), b"A");
    }

    #[test]
    fn debug_mode_dumps_after_retired_cycles_only() {
        let mut ctx = CpuContext::default();
        let (memory, console) = run_words(&mut ctx, &[0x0300, 0x4810], 2);
        assert_eq!(console.debug_text().lines().count(), 4);
        assert!(console.debug_text().starts_with("PC: 0002, State: 0002: Registers:"));

        let bus = Bus::new(&memory, &console);
        assert_eq!(step_one(&mut ctx, &bus, DispatchTable::shared()), StepOutcome::Halted);
        assert_eq!(console.debug_text().lines().count(), 4);
    }

    #[test]
    fn div_by_zero_without_vector_table_faults() {
        let memory = SharedMemory::new();
        let console = CaptureConsole::new();
        let bus = Bus::new(&memory, &console);
        memory.write_u16_be(0_u16, 0x8412);

        let mut ctx = CpuContext::default();
        ctx.set_reg(GeneralRegister::R2, 9);
        let outcome = step_one(&mut ctx, &bus, DispatchTable::shared());

        assert_eq!(
            outcome,
            StepOutcome::Fault {
                cause: FaultCode::DivideByZero
            }
        );
        assert_eq!(ctx.reg(GeneralRegister::R2), 9);
    }

    #[test]
    fn iret_outside_a_handler_still_pops_pc_and_state() {
        let memory = SharedMemory::new();
        let console = CaptureConsole::new();
        let bus = Bus::new(&memory, &console);
        memory.write_u16_be(0x0010_u16, 0x0600);
        memory.write_u16_be(0x7FFC_u16, 0x0120);
        memory.write_u16_be(0x7FFE_u16, STATE_CONDITION);

        let mut ctx = CpuContext::default();
        ctx.set_pc(0x0010);
        ctx.set_sp(0x7FFC);
        assert!(!ctx.in_exception());

        assert_eq!(step_one(&mut ctx, &bus, DispatchTable::shared()), StepOutcome::Retired);

        assert_eq!(ctx.pc(), 0x0120);
        assert_eq!(ctx.state(), STATE_CONDITION);
        assert_eq!(ctx.sp(), 0x8000);
    }
}
