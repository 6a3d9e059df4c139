//! Heap emitter
//!
//! Emits tuple/closure allocation and field-write sequences against the
//! implicit accumulator (`EAX`) and scratch register (`EBX`), bumping
//! the dedicated allocator pointer (`ESI`) as it goes.
//!
//! `alloc_words` is the primitive both heap records are built from:
//! `tuple_alloc` is `alloc_words` plus writing the tuple's encoded size
//! at word 0. A closure's word 0 (raw arity, not an encoded number)
//! doesn't fit that shape, so `codegen.rs`'s `Lam`/`Fun` case calls
//! `alloc_words` directly and then `tuple_write`s the arity and code
//! pointer itself. `EAX` ends up a validly tagged heap pointer past
//! all padding either way.

use fdl_core::value::{self, Ty};
use fdl_core::{Instruction, Operand, Reg};

/// Copy the bump pointer into `EAX` and advance it past `total_words`
/// words (rounded up to an even count by the caller via
/// `fdl_core::value::{tuple_alloc_words, closure_alloc_words}`).
pub fn alloc_words(total_words: usize) -> Vec<Instruction> {
    vec![
        Instruction::Mov(Operand::Reg(Reg::Eax), Operand::Reg(Reg::Esi)),
        Instruction::Add(
            Operand::Reg(Reg::Esi),
            Operand::Const(4 * total_words as i32),
        ),
    ]
}

/// Allocate a tuple of arity `k`: reserves `tuple_alloc_words(k)` words
/// and writes the encoded size at word 0.
pub fn tuple_alloc(k: usize) -> Vec<Instruction> {
    let mut instrs = alloc_words(value::tuple_alloc_words(k));
    instrs.push(Instruction::Mov(
        Operand::RegOffset(Reg::Eax, 0),
        Operand::Const(value::repr_int(k as i32)),
    ));
    instrs
}

/// Write `fields` into consecutive heap words starting at
/// `start_index`, each routed through the scratch register since x86
/// forbids a memory-to-memory `mov`.
pub fn tuple_write(fields: &[Operand], start_index: usize) -> Vec<Instruction> {
    let mut instrs = Vec::with_capacity(fields.len() * 2);
    for (offset, field) in fields.iter().enumerate() {
        let index = start_index + offset;
        instrs.push(Instruction::Mov(Operand::Reg(Reg::Ebx), field.clone()));
        instrs.push(Instruction::Mov(
            Operand::RegOffset(Reg::Eax, 4 * index as i32),
            Operand::Reg(Reg::Ebx),
        ));
    }
    instrs
}

/// Zero the padding word at `index`, if the allocation needed one.
pub fn add_pad(index: usize) -> Vec<Instruction> {
    vec![Instruction::Mov(
        Operand::RegOffset(Reg::Eax, 4 * index as i32),
        Operand::Const(0),
    )]
}

/// OR the type tag for `ty` into `reg`, completing the tagged pointer.
pub fn set_tag(reg: Reg, ty: Ty) -> Vec<Instruction> {
    vec![Instruction::Or(
        Operand::Reg(reg),
        Operand::Const(value::type_tag(ty)),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_alloc_writes_encoded_size_at_word_zero() {
        let instrs = tuple_alloc(3);
        assert_eq!(
            instrs[2],
            Instruction::Mov(
                Operand::RegOffset(Reg::Eax, 0),
                Operand::Const(value::repr_int(3))
            )
        );
    }

    #[test]
    fn tuple_write_routes_every_field_through_scratch() {
        let fields = vec![Operand::Const(10), Operand::Const(20)];
        let instrs = tuple_write(&fields, 1);
        assert_eq!(instrs.len(), 4);
        assert_eq!(
            instrs[0],
            Instruction::Mov(Operand::Reg(Reg::Ebx), Operand::Const(10))
        );
        assert_eq!(
            instrs[1],
            Instruction::Mov(Operand::RegOffset(Reg::Eax, 4), Operand::Reg(Reg::Ebx))
        );
        assert_eq!(
            instrs[3],
            Instruction::Mov(Operand::RegOffset(Reg::Eax, 8), Operand::Reg(Reg::Ebx))
        );
    }

    #[test]
    fn set_tag_ors_the_type_tag_into_the_given_register() {
        let instrs = set_tag(Reg::Eax, Ty::Tuple);
        assert_eq!(
            instrs[0],
            Instruction::Or(Operand::Reg(Reg::Eax), Operand::Const(value::TUPLE_TAG))
        );
    }

    #[test]
    fn alloc_words_advances_esi_by_four_times_word_count() {
        let instrs = alloc_words(4);
        assert_eq!(
            instrs[1],
            Instruction::Add(Operand::Reg(Reg::Esi), Operand::Const(16))
        );
    }
}
