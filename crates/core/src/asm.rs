//! Textual assembly serialization
//!
//! Stands in for a real external assembler collaborator: turns the
//! abstract instruction stream into a readable listing. This is
//! convenience output for the CLI and tests, not a NASM/GAS emitter,
//! so no encoding or relocation concerns apply here.

use crate::instr::{Instruction, Operand, Reg};
use std::fmt;

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg::Eax => "eax",
            Reg::Ebx => "ebx",
            Reg::Ecx => "ecx",
            Reg::Esp => "esp",
            Reg::Ebp => "ebp",
            Reg::Esi => "esi",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{r}"),
            Operand::Const(n) => write!(f, "{n}"),
            Operand::HexConst(n) => write!(f, "0x{n:X}"),
            Operand::RegOffset(r, 0) => write!(f, "[{r}]"),
            Operand::RegOffset(r, disp) if *disp > 0 => write!(f, "[{r} + {disp}]"),
            Operand::RegOffset(r, disp) => write!(f, "[{r} - {}]", -disp),
            Operand::Indexed { base, index } => write!(f, "[{base} + {index}*4]"),
            Operand::CodePtr(label) => write!(f, "{label}"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Mov(dst, src) => write!(f, "  mov  {dst}, {src}"),
            Instruction::Push(op) => write!(f, "  push {op}"),
            Instruction::Pop(op) => write!(f, "  pop  {op}"),
            Instruction::Add(dst, src) => write!(f, "  add  {dst}, {src}"),
            Instruction::Sub(dst, src) => write!(f, "  sub  {dst}, {src}"),
            Instruction::IMul(dst, src) => write!(f, "  imul {dst}, {src}"),
            Instruction::And(dst, src) => write!(f, "  and  {dst}, {src}"),
            Instruction::Or(dst, src) => write!(f, "  or   {dst}, {src}"),
            Instruction::Shl(dst, src) => write!(f, "  shl  {dst}, {src}"),
            Instruction::Sar(dst, src) => write!(f, "  sar  {dst}, {src}"),
            Instruction::Cmp(lhs, rhs) => write!(f, "  cmp  {lhs}, {rhs}"),
            Instruction::Jmp(l) => write!(f, "  jmp  {l}"),
            Instruction::Je(l) => write!(f, "  je   {l}"),
            Instruction::Jne(l) => write!(f, "  jne  {l}"),
            Instruction::Jl(l) => write!(f, "  jl   {l}"),
            Instruction::Jg(l) => write!(f, "  jg   {l}"),
            Instruction::Jge(l) => write!(f, "  jge  {l}"),
            Instruction::Jo(l) => write!(f, "  jo   {l}"),
            Instruction::Call(op) => write!(f, "  call {op}"),
            Instruction::Ret => write!(f, "  ret"),
            Instruction::Label(l) => write!(f, "{l}:"),
        }
    }
}

/// Render a full instruction stream as a newline-joined listing.
pub fn render(instrs: &[Instruction]) -> String {
    instrs
        .iter()
        .map(Instruction::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::{Label, Reg};

    #[test]
    fn renders_a_small_stream() {
        let stream = vec![
            Instruction::Mov(Operand::Reg(Reg::Eax), Operand::Const(6)),
            Instruction::Label(Label("done".to_string())),
            Instruction::Ret,
        ];
        let text = render(&stream);
        assert_eq!(text, "  mov  eax, 6\ndone:\n  ret");
    }

    #[test]
    fn negative_displacement_renders_with_minus() {
        let op = Operand::RegOffset(Reg::Ebp, -8);
        assert_eq!(op.to_string(), "[ebp - 8]");
    }
}
