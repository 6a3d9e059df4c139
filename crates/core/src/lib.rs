//! FDL Core: value tagging and the abstract instruction model
//!
//! This crate provides the language-agnostic pieces shared between the
//! code generator and anything that consumes its output:
//!
//! - `value`: the tagged-word representation (numbers, booleans, tuple
//!   and closure pointers) and the type tag/mask constants used by the
//!   assertion emitter.
//! - `instr`: a closed, exhaustively-matched instruction and operand
//!   model (registers, immediates, indirect addressing forms, and
//!   symbolic labels).
//! - `asm`: a textual `Display` serializer over `instr`, standing in
//!   for the real assembler collaborator.

pub mod asm;
pub mod instr;
pub mod value;

pub use instr::{ErrorKind, Instruction, Label, Operand, Reg};
pub use value::Ty;
