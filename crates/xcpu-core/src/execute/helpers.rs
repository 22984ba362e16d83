//! Stack, immediate and branch-target helpers shared by handlers.

use crate::memory::{SharedMemory, WORD_BYTES};
use crate::state::CpuContext;

/// Pushes a word: `sp -= 2`, then stores at the new `sp`.
pub fn push_word(ctx: &mut CpuContext, memory: &SharedMemory, value: u16) {
    let sp = ctx.sp().wrapping_sub(WORD_BYTES);
    ctx.set_sp(sp);
    memory.write_u16_be(sp, value);
}

/// Pops a word: loads at `sp`, then `sp += 2`.
#[must_use]
pub fn pop_word(ctx: &mut CpuContext, memory: &SharedMemory) -> u16 {
    let sp = ctx.sp();
    let value = memory.read_u16_be(sp);
    ctx.set_sp(sp.wrapping_add(WORD_BYTES));
    value
}

/// Reads the trailing 16-bit word of an extended instruction and steps over it.
#[must_use]
pub fn fetch_immediate(ctx: &mut CpuContext, memory: &SharedMemory) -> u16 {
    let pc = ctx.pc();
    let value = memory.read_u16_be(pc);
    ctx.set_pc(pc.wrapping_add(WORD_BYTES));
    value
}

/// Target of a relative branch, counted from the instruction after it.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn relative_target(next_pc: u16, offset: i8) -> u16 {
    next_pc.wrapping_add(offset as i16 as u16)
}
