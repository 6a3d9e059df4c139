//! Assertion emitter
//!
//! Dynamic type, arity, and bounds checks that jump to a named error
//! stub on failure. Every stub is resolved by the runtime; this crate
//! only ever emits the symbolic jump target.

use crate::config::CodegenConfig;
use crate::labels;
use fdl_core::value::{self, Ty};
use fdl_core::{ErrorKind, Instruction, Operand, Reg};

fn error_kind_for(ty: Ty) -> ErrorKind {
    match ty {
        Ty::Number => ErrorKind::NonNumber,
        Ty::Boolean => ErrorKind::NonBoolean,
        Ty::Tuple => ErrorKind::NonTuple,
        Ty::Closure => ErrorKind::NonClosure,
    }
}

/// A comparison outcome a boolean can be materialized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    NotEq,
    Lt,
    Gt,
}

fn jump_on(cond: Cond, label: fdl_core::Label) -> Instruction {
    match cond {
        Cond::Eq => Instruction::Je(label),
        Cond::NotEq => Instruction::Jne(label),
        Cond::Lt => Instruction::Jl(label),
        Cond::Gt => Instruction::Jg(label),
    }
}

/// Load `v` into `EAX`, confirm it has type `ty`, and jump to the
/// matching `error_non_*` stub if it doesn't. Falls through on success
/// with `EAX` holding `v`.
pub fn assert_type(v: Operand, ty: Ty, config: &CodegenConfig) -> Vec<Instruction> {
    vec![
        Instruction::Mov(Operand::Reg(Reg::Eax), v),
        Instruction::Mov(Operand::Reg(Reg::Ebx), Operand::Reg(Reg::Eax)),
        Instruction::And(Operand::Reg(Reg::Ebx), Operand::Const(value::type_mask(ty))),
        Instruction::Cmp(Operand::Reg(Reg::Ebx), Operand::Const(value::type_tag(ty))),
        Instruction::Jne(config.error_label(error_kind_for(ty))),
    ]
}

/// `BranchTrue`/`BranchDone` skeleton shared by `is_type` and `If`:
/// materializes the encoded boolean for whichever side of `cond` wins
/// into `EAX`.
pub fn bool_branch(tag_id: u32, cond: Cond) -> Vec<Instruction> {
    let true_label = labels::branch_true(tag_id);
    let done_label = labels::branch_done(tag_id);
    vec![
        jump_on(cond, true_label.clone()),
        Instruction::Mov(Operand::Reg(Reg::Eax), Operand::Const(value::BOOL_FALSE)),
        Instruction::Jmp(done_label.clone()),
        Instruction::Label(true_label),
        Instruction::Mov(Operand::Reg(Reg::Eax), Operand::Const(value::BOOL_TRUE)),
        Instruction::Label(done_label),
    ]
}

/// Load `v`, compare it against `ty`'s tag, and materialize the
/// encoded boolean result in `EAX` rather than trapping.
pub fn is_type(v: Operand, ty: Ty, tag_id: u32) -> Vec<Instruction> {
    let mut instrs = vec![
        Instruction::Mov(Operand::Reg(Reg::Eax), v),
        Instruction::Mov(Operand::Reg(Reg::Ebx), Operand::Reg(Reg::Eax)),
        Instruction::And(Operand::Reg(Reg::Ebx), Operand::Const(value::type_mask(ty))),
        Instruction::Cmp(Operand::Reg(Reg::Ebx), Operand::Const(value::type_tag(ty))),
    ];
    instrs.extend(bool_branch(tag_id, Cond::Eq));
    instrs
}

/// Bounds-check a `GetItem(vE, vI)` access: `vI` below zero jumps to
/// `error_index_low`; `vI` at or beyond the tuple's size jumps to
/// `error_index_high`.
///
/// The upper-bound compare deliberately uses the *encoded* index
/// against the *encoded* size word (no decoding needed, since both
/// sides carry the same `<<1` factor) and rejects `index >= size`
/// with `JGE`. Using `JG` instead would admit the out-of-bounds case
/// `index == size`, so `JGE` is the one that matches a zero-based
/// tuple's actual valid range.
pub fn assert_bound(tuple: Operand, index: Operand, config: &CodegenConfig) -> Vec<Instruction> {
    vec![
        // Lower bound: decode the index and reject negatives.
        Instruction::Mov(Operand::Reg(Reg::Eax), index.clone()),
        Instruction::Sar(Operand::Reg(Reg::Eax), Operand::Const(1)),
        Instruction::Cmp(Operand::Reg(Reg::Eax), Operand::Const(0)),
        Instruction::Jl(config.error_label(ErrorKind::IndexLow)),
        // Upper bound: compare encoded index to the encoded size word.
        Instruction::Mov(Operand::Reg(Reg::Eax), tuple),
        Instruction::Sub(Operand::Reg(Reg::Eax), Operand::Const(value::TUPLE_TAG)),
        Instruction::Mov(
            Operand::Reg(Reg::Ebx),
            Operand::RegOffset(Reg::Eax, 0),
        ),
        Instruction::Mov(Operand::Reg(Reg::Eax), index),
        Instruction::Cmp(Operand::Reg(Reg::Eax), Operand::Reg(Reg::Ebx)),
        Instruction::Jge(config.error_label(ErrorKind::IndexHigh)),
    ]
}

/// Confirm a closure's stored arity equals the `k` arguments it is
/// being called with.
pub fn assert_arity(closure: Operand, k: usize, config: &CodegenConfig) -> Vec<Instruction> {
    vec![
        Instruction::Mov(Operand::Reg(Reg::Eax), closure),
        Instruction::Sub(Operand::Reg(Reg::Eax), Operand::Const(value::CLOSURE_TAG)),
        Instruction::Mov(
            Operand::Reg(Reg::Ebx),
            Operand::RegOffset(Reg::Eax, 0),
        ),
        Instruction::Cmp(Operand::Reg(Reg::Ebx), Operand::Const(k as i32)),
        Instruction::Jne(config.error_label(ErrorKind::Arity)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_type_jumps_to_the_matching_stub() {
        let config = CodegenConfig::new();
        let instrs = assert_type(Operand::Const(6), Ty::Number, &config);
        assert_eq!(instrs.last(), Some(&Instruction::Jne(ErrorKind::NonNumber.label())));
    }

    #[test]
    fn assert_type_number_vs_closure_use_different_stubs() {
        let config = CodegenConfig::new();
        let num = assert_type(Operand::Const(0), Ty::Number, &config);
        let clo = assert_type(Operand::Const(0), Ty::Closure, &config);
        assert_ne!(num.last(), clo.last());
    }

    #[test]
    fn assert_type_honors_a_configured_label_override() {
        let config = CodegenConfig::new()
            .with_error_label(ErrorKind::NonNumber, "rt_non_number")
            .unwrap();
        let instrs = assert_type(Operand::Const(6), Ty::Number, &config);
        assert_eq!(
            instrs.last(),
            Some(&Instruction::Jne(fdl_core::Label("rt_non_number".to_string())))
        );
    }

    #[test]
    fn bool_branch_labels_are_scoped_to_the_tag() {
        let instrs = bool_branch(42, Cond::Eq);
        assert_eq!(instrs[0], Instruction::Je(labels::branch_true(42)));
        assert!(instrs.contains(&Instruction::Label(labels::branch_true(42))));
        assert!(instrs.contains(&Instruction::Label(labels::branch_done(42))));
    }

    #[test]
    fn assert_bound_upper_check_uses_jge_not_jg() {
        let config = CodegenConfig::new();
        let instrs = assert_bound(Operand::Const(1), Operand::Const(0), &config);
        assert!(matches!(instrs.last(), Some(Instruction::Jge(_))));
    }

    #[test]
    fn assert_bound_lower_check_jumps_to_index_low() {
        let config = CodegenConfig::new();
        let instrs = assert_bound(Operand::Const(1), Operand::Const(0), &config);
        assert!(instrs.contains(&Instruction::Jl(ErrorKind::IndexLow.label())));
    }

    #[test]
    fn assert_arity_compares_raw_arity_not_encoded() {
        let config = CodegenConfig::new();
        let instrs = assert_arity(Operand::Const(0), 2, &config);
        assert_eq!(
            instrs[3],
            Instruction::Cmp(Operand::Reg(Reg::Ebx), Operand::Const(2))
        );
    }
}
