//! One handler per assigned opcode.
//!
//! Every handler runs with `pc` already past the instruction word. Two-register
//! operations read `reg1` as the source and write `reg2`.

#![allow(clippy::trivially_copy_pass_by_ref, clippy::needless_pass_by_ref_mut)]

use super::helpers::{fetch_immediate, pop_word, push_word, relative_target};
use super::Handler;
use crate::api::{Bus, StepOutcome};
use crate::decoder::DecodedInstruction;
use crate::encoding::Opcode;
use crate::exception::{raise_exception, return_from_exception};
use crate::state::{CpuContext, STATE_CONDITION, STATE_DEBUG, STATE_IN_EXCEPTION};
use crate::{ExceptionKind, FaultCode};

/// Returns the handler for an assigned opcode.
pub(super) fn handler_for(opcode: Opcode) -> Handler {
    match opcode {
        Opcode::Bad => halt,
        Opcode::Ret => ret,
        Opcode::Cld => clear_debug,
        Opcode::Std => set_debug,
        Opcode::Cli => clear_exception,
        Opcode::Sti => set_exception,
        Opcode::Iret => iret,
        Opcode::Trap => trap,
        Opcode::Neg => neg,
        Opcode::Not => not,
        Opcode::Push => push,
        Opcode::Pop => pop,
        Opcode::Jmpr => jmpr,
        Opcode::Callr => callr,
        Opcode::Out => out,
        Opcode::Inc => inc,
        Opcode::Dec => dec,
        Opcode::Lit => lit,
        Opcode::Cpuid => cpuid,
        Opcode::Cpunum => cpunum,
        Opcode::Br => br,
        Opcode::Jr => jr,
        Opcode::Add => add,
        Opcode::Sub => sub,
        Opcode::Mul => mul,
        Opcode::Div => div,
        Opcode::And => and,
        Opcode::Or => or,
        Opcode::Xor => xor,
        Opcode::Shr => shr,
        Opcode::Shl => shl,
        Opcode::Test => test,
        Opcode::Cmp => cmp,
        Opcode::Equ => equ,
        Opcode::Mov => mov,
        Opcode::Load => load,
        Opcode::Stor => stor,
        Opcode::Loadb => loadb,
        Opcode::Storb => storb,
        Opcode::Loada => loada,
        Opcode::Stora => stora,
        Opcode::Tnset => tnset,
        Opcode::Jmp => jmp,
        Opcode::Call => call,
        Opcode::Loadi => loadi,
    }
}

/// Halts the context. Installed for `bad` and every unmapped opcode byte.
pub(super) const fn halt(_: &mut CpuContext, _: &Bus<'_>, _: &DecodedInstruction) -> StepOutcome {
    StepOutcome::Halted
}

fn binary(
    ctx: &mut CpuContext,
    instr: &DecodedInstruction,
    op: impl FnOnce(u16, u16) -> u16,
) -> StepOutcome {
    let result = op(ctx.reg(instr.reg1), ctx.reg(instr.reg2));
    ctx.set_reg(instr.reg2, result);
    StepOutcome::Retired
}

fn unary(ctx: &mut CpuContext, instr: &DecodedInstruction, op: impl FnOnce(u16) -> u16) -> StepOutcome {
    let result = op(ctx.reg(instr.reg1));
    ctx.set_reg(instr.reg1, result);
    StepOutcome::Retired
}

fn compare(
    ctx: &mut CpuContext,
    instr: &DecodedInstruction,
    predicate: impl FnOnce(u16, u16) -> bool,
) -> StepOutcome {
    let condition = predicate(ctx.reg(instr.reg1), ctx.reg(instr.reg2));
    ctx.set_flag(STATE_CONDITION, condition);
    StepOutcome::Retired
}

const fn set_state_bit(ctx: &mut CpuContext, flag: u16, enabled: bool) -> StepOutcome {
    ctx.set_flag(flag, enabled);
    StepOutcome::Retired
}

fn ret(ctx: &mut CpuContext, bus: &Bus<'_>, _: &DecodedInstruction) -> StepOutcome {
    let pc = pop_word(ctx, bus.memory);
    ctx.set_pc(pc);
    StepOutcome::Retired
}

fn clear_debug(ctx: &mut CpuContext, _: &Bus<'_>, _: &DecodedInstruction) -> StepOutcome {
    set_state_bit(ctx, STATE_DEBUG, false)
}

fn set_debug(ctx: &mut CpuContext, _: &Bus<'_>, _: &DecodedInstruction) -> StepOutcome {
    set_state_bit(ctx, STATE_DEBUG, true)
}

fn clear_exception(ctx: &mut CpuContext, _: &Bus<'_>, _: &DecodedInstruction) -> StepOutcome {
    set_state_bit(ctx, STATE_IN_EXCEPTION, false)
}

fn set_exception(ctx: &mut CpuContext, _: &Bus<'_>, _: &DecodedInstruction) -> StepOutcome {
    set_state_bit(ctx, STATE_IN_EXCEPTION, true)
}

fn iret(ctx: &mut CpuContext, bus: &Bus<'_>, _: &DecodedInstruction) -> StepOutcome {
    return_from_exception(ctx, bus.memory);
    StepOutcome::Retired
}

fn trap(ctx: &mut CpuContext, bus: &Bus<'_>, _: &DecodedInstruction) -> StepOutcome {
    if !ctx.in_exception() {
        // A refused trap is a no-op.
        let _ = raise_exception(ctx, bus.memory, ExceptionKind::Trap);
    }
    StepOutcome::Retired
}

fn neg(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    unary(ctx, instr, u16::wrapping_neg)
}

fn not(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    unary(ctx, instr, |value| u16::from(value == 0))
}

fn push(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    let value = ctx.reg(instr.reg1);
    push_word(ctx, bus.memory, value);
    StepOutcome::Retired
}

fn pop(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    let value = pop_word(ctx, bus.memory);
    ctx.set_reg(instr.reg1, value);
    StepOutcome::Retired
}

const fn jmpr(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    ctx.set_pc(ctx.reg(instr.reg1));
    StepOutcome::Retired
}

fn callr(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    let target = ctx.reg(instr.reg1);
    let return_pc = ctx.pc();
    push_word(ctx, bus.memory, return_pc);
    ctx.set_pc(target);
    StepOutcome::Retired
}

fn out(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    let [_, low] = ctx.reg(instr.reg1).to_be_bytes();
    bus.output.emit(low);
    StepOutcome::Retired
}

fn inc(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    unary(ctx, instr, |value| value.wrapping_add(1))
}

fn dec(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    unary(ctx, instr, |value| value.wrapping_sub(1))
}

const fn lit(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    ctx.set_itr(ctx.reg(instr.reg1));
    StepOutcome::Retired
}

const fn cpuid(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    ctx.set_reg(instr.reg1, ctx.id());
    StepOutcome::Retired
}

const fn cpunum(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    ctx.set_reg(instr.reg1, ctx.cpu_count());
    StepOutcome::Retired
}

const fn br(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    if ctx.condition() {
        ctx.set_pc(relative_target(ctx.pc(), instr.immediate));
    }
    StepOutcome::Retired
}

const fn jr(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    ctx.set_pc(relative_target(ctx.pc(), instr.immediate));
    StepOutcome::Retired
}

fn add(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    binary(ctx, instr, |src, dst| dst.wrapping_add(src))
}

fn sub(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    binary(ctx, instr, |src, dst| dst.wrapping_sub(src))
}

fn mul(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    binary(ctx, instr, |src, dst| dst.wrapping_mul(src))
}

fn div(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    let divisor = ctx.reg(instr.reg1);
    if divisor == 0 {
        let cause = FaultCode::DivideByZero;
        return match raise_exception(ctx, bus.memory, cause.exception_kind()) {
            Ok(()) => StepOutcome::Retired,
            Err(_) => StepOutcome::Fault { cause },
        };
    }
    binary(ctx, instr, |_, dst| dst / divisor)
}

fn and(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    binary(ctx, instr, |src, dst| dst & src)
}

fn or(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    binary(ctx, instr, |src, dst| dst | src)
}

fn xor(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    binary(ctx, instr, |src, dst| dst ^ src)
}

fn shr(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    binary(ctx, instr, |src, dst| dst.checked_shr(u32::from(src)).unwrap_or(0))
}

fn shl(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    binary(ctx, instr, |src, dst| dst.checked_shl(u32::from(src)).unwrap_or(0))
}

fn test(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    compare(ctx, instr, |a, b| (a & b) != 0)
}

fn cmp(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    compare(ctx, instr, |a, b| a < b)
}

fn equ(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    compare(ctx, instr, |a, b| a == b)
}

fn mov(ctx: &mut CpuContext, _: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    binary(ctx, instr, |src, _| src)
}

fn load(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    let value = bus.memory.read_u16_be(ctx.reg(instr.reg1));
    ctx.set_reg(instr.reg2, value);
    StepOutcome::Retired
}

fn stor(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    bus.memory
        .write_u16_be(ctx.reg(instr.reg2), ctx.reg(instr.reg1));
    StepOutcome::Retired
}

fn loadb(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    let value = bus.memory.read_u8(ctx.reg(instr.reg1));
    ctx.set_reg(instr.reg2, u16::from(value));
    StepOutcome::Retired
}

fn storb(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    let [_, low] = ctx.reg(instr.reg1).to_be_bytes();
    bus.memory.write_u8(ctx.reg(instr.reg2), low);
    StepOutcome::Retired
}

fn loada(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    let value = bus.memory.atomic().read_u16_be(ctx.reg(instr.reg1));
    ctx.set_reg(instr.reg2, value);
    StepOutcome::Retired
}

fn stora(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    bus.memory
        .atomic()
        .write_u16_be(ctx.reg(instr.reg2), ctx.reg(instr.reg1));
    StepOutcome::Retired
}

fn tnset(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    let previous = bus.memory.atomic().test_and_set(ctx.reg(instr.reg1));
    ctx.set_reg(instr.reg2, previous);
    StepOutcome::Retired
}

fn jmp(ctx: &mut CpuContext, bus: &Bus<'_>, _: &DecodedInstruction) -> StepOutcome {
    let target = fetch_immediate(ctx, bus.memory);
    ctx.set_pc(target);
    StepOutcome::Retired
}

fn call(ctx: &mut CpuContext, bus: &Bus<'_>, _: &DecodedInstruction) -> StepOutcome {
    let target = fetch_immediate(ctx, bus.memory);
    let return_pc = ctx.pc();
    push_word(ctx, bus.memory, return_pc);
    ctx.set_pc(target);
    StepOutcome::Retired
}

fn loadi(ctx: &mut CpuContext, bus: &Bus<'_>, instr: &DecodedInstruction) -> StepOutcome {
    let value = fetch_immediate(ctx, bus.memory);
    ctx.set_reg(instr.reg1, value);
    StepOutcome::Retired
}
