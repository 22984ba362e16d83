//! Exception and interrupt vectoring.
//!
//! Entry pushes `state` then `pc`, marks the context as in-exception and jumps
//! through the vector table at `itr`. Refused entries change nothing.

use crate::execute::helpers::{pop_word, push_word};
use crate::memory::SharedMemory;
use crate::state::{CpuContext, STATE_IN_EXCEPTION};
use crate::{ExceptionError, ExceptionKind};

/// Delivers an exception of `kind` to `ctx`.
///
/// # Errors
///
/// Returns [`ExceptionError::AlreadyInException`] when `state` bit 2 is set and
/// [`ExceptionError::NoVectorTable`] when `itr` is zero. The context is left
/// unchanged on error.
pub fn raise_exception(
    ctx: &mut CpuContext,
    memory: &SharedMemory,
    kind: ExceptionKind,
) -> Result<(), ExceptionError> {
    if ctx.in_exception() {
        tracing::debug!(cpu = ctx.id(), ?kind, "exception refused: already in exception");
        return Err(ExceptionError::AlreadyInException);
    }
    if ctx.itr() == 0 {
        tracing::debug!(cpu = ctx.id(), ?kind, "exception refused: no vector table");
        return Err(ExceptionError::NoVectorTable);
    }

    let return_pc = ctx.pc();
    let saved_state = ctx.state();
    push_word(ctx, memory, saved_state);
    push_word(ctx, memory, return_pc);
    ctx.set_flag(STATE_IN_EXCEPTION, true);

    let vector = ctx.itr().wrapping_add(kind.vector_offset());
    let handler = memory.read_u16_be(vector);
    ctx.set_pc(handler);

    tracing::debug!(cpu = ctx.id(), ?kind, return_pc, handler, "exception delivered");
    Ok(())
}

/// Delivers an exception named by its raw vector-table ordinal.
///
/// # Errors
///
/// Returns [`ExceptionError::InvalidKind`] for ordinals outside the defined
/// kinds, otherwise the errors of [`raise_exception`].
pub fn raise_exception_ordinal(
    ctx: &mut CpuContext,
    memory: &SharedMemory,
    ordinal: u16,
) -> Result<(), ExceptionError> {
    let kind = ExceptionKind::from_ordinal(ordinal).ok_or(ExceptionError::InvalidKind(ordinal))?;
    raise_exception(ctx, memory, kind)
}

/// Leaves an exception handler: pops `pc`, then `state`.
///
/// Unconditional; executing it outside a handler pops whatever is on the stack.
pub fn return_from_exception(ctx: &mut CpuContext, memory: &SharedMemory) {
    let pc = pop_word(ctx, memory);
    let state = pop_word(ctx, memory);
    ctx.set_pc(pc);
    ctx.set_state(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::STATE_CONDITION;

    fn context_with_table(memory: &SharedMemory) -> CpuContext {
        memory.write_u16_be(0x0200_u16, 0x1000);
        memory.write_u16_be(0x0202_u16, 0x2000);
        memory.write_u16_be(0x0204_u16, 0x3000);

        let mut ctx = CpuContext::default();
        ctx.set_itr(0x0200);
        ctx.set_sp(0x8000);
        ctx.set_pc(0x0040);
        ctx.set_flag(STATE_CONDITION, true);
        ctx
    }

    #[test]
    fn delivery_pushes_state_then_pc_and_vectors() {
        let memory = SharedMemory::new();
        let mut ctx = context_with_table(&memory);

        raise_exception(&mut ctx, &memory, ExceptionKind::Trap).expect("deliverable");

        assert_eq!(ctx.pc(), 0x2000);
        assert_eq!(ctx.sp(), 0x7FFC);
        assert!(ctx.in_exception());
        assert!(ctx.condition());
        assert_eq!(memory.read_u16_be(0x7FFE_u16), STATE_CONDITION);
        assert_eq!(memory.read_u16_be(0x7FFC_u16), 0x0040);
    }

    #[test]
    fn nested_delivery_is_refused_without_side_effects() {
        let memory = SharedMemory::new();
        let mut ctx = context_with_table(&memory);
        raise_exception(&mut ctx, &memory, ExceptionKind::Interrupt).expect("first");

        let before = ctx.clone();
        let image = memory.snapshot();
        let err = raise_exception(&mut ctx, &memory, ExceptionKind::Fault).expect_err("nested");

        assert_eq!(err, ExceptionError::AlreadyInException);
        assert_eq!(ctx, before);
        assert_eq!(memory.snapshot(), image);
    }

    #[test]
    fn missing_vector_table_is_refused() {
        let memory = SharedMemory::new();
        let mut ctx = CpuContext::default();
        ctx.set_sp(0x8000);

        let err = raise_exception(&mut ctx, &memory, ExceptionKind::Trap).expect_err("no table");
        assert_eq!(err, ExceptionError::NoVectorTable);
        assert_eq!(ctx.sp(), 0x8000);
        assert_eq!(ctx.pc(), 0);
    }

    #[test]
    fn out_of_range_ordinal_is_refused() {
        let memory = SharedMemory::new();
        let mut ctx = context_with_table(&memory);
        let before = ctx.clone();

        let err = raise_exception_ordinal(&mut ctx, &memory, 3).expect_err("invalid");
        assert_eq!(err, ExceptionError::InvalidKind(3));
        assert_eq!(ctx, before);

        raise_exception_ordinal(&mut ctx, &memory, 2).expect("fault ordinal");
        assert_eq!(ctx.pc(), 0x3000);
    }

    #[test]
    fn return_restores_pc_and_state() {
        let memory = SharedMemory::new();
        let mut ctx = context_with_table(&memory);
        raise_exception(&mut ctx, &memory, ExceptionKind::Interrupt).expect("deliverable");
        assert_eq!(ctx.pc(), 0x1000);

        return_from_exception(&mut ctx, &memory);

        assert_eq!(ctx.pc(), 0x0040);
        assert_eq!(ctx.state(), STATE_CONDITION);
        assert_eq!(ctx.sp(), 0x8000);
        assert!(!ctx.in_exception());
    }
}
