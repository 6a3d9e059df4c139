//! Expression compiler and top-level wrapper
//!
//! `compile_env` is the recursive core: it dispatches on the shape of
//! an ANF node and threads the environment through `Let`, `Lam`, and
//! `Fun`. `compile` is the crate's primary entry point: it runs
//! `compile_env` from an empty environment. `wrap` applies the
//! prologue/epilogue calling convention around a compiled body, for
//! both the top-level program and (internally, via `compile_closure`)
//! every `Lam`/`Fun` body.
//!
//! Two emit-time error categories exist: an unbound identifier
//! reaching `imm_arg`, and a non-immediate found where an immediate
//! was required. `EmitError::NotImmediate` models the latter for
//! completeness; `imm_arg` itself can never produce it, since
//! `ImmExpr` and `Expr` are distinct types and a non-immediate in an
//! immediate position is rejected by the Rust compiler building this
//! crate before `compile_env` ever runs (see DESIGN.md).

use crate::ast::{Expr, ImmExpr, Prim1Op, Prim2Op, Tag};
use crate::asserts::{self, Cond};
use crate::config::CodegenConfig;
use crate::env::{self, Env};
use crate::freevars;
use crate::heap;
use crate::labels;
use crate::stacksize;
use fdl_core::value::{self, Ty};
use fdl_core::{Instruction, Label, Operand, Reg};
use std::fmt;

/// An emit-time failure: a bug upstream of this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    /// `name` was referenced at `tag` but is not bound in scope. The
    /// checker that should have rejected this is out of scope here.
    UnboundIdentifier { name: String, tag: Tag },
    /// A non-immediate stood where an immediate was required at `tag`.
    /// Unreachable from this crate's own `Expr`/`ImmExpr` split; kept
    /// so the two emit-time categories this crate documents both have
    /// a value a caller embedding a different AST could construct.
    NotImmediate { tag: Tag },
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::UnboundIdentifier { name, tag } => {
                write!(f, "unbound variable `{name}` at {tag}")
            }
            EmitError::NotImmediate { tag } => {
                write!(f, "expected an immediate expression at {tag}")
            }
        }
    }
}

impl std::error::Error for EmitError {}

/// Resolve an immediate to the operand holding its value: a constant
/// for literals, or the identifier's frame-slot address.
fn imm_arg(env: &Env, imm: &ImmExpr) -> Result<Operand, EmitError> {
    match imm {
        ImmExpr::Number(n, _) => Ok(Operand::Const(value::repr_int(*n))),
        ImmExpr::Boolean(b, _) => Ok(Operand::Const(value::repr_bool(*b))),
        ImmExpr::Id(name, tag) => env
            .lookup(name)
            .map(env::slot_address)
            .ok_or_else(|| EmitError::UnboundIdentifier {
                name: name.clone(),
                tag: *tag,
            }),
    }
}

/// Function prologue: reserve `n` local slots and realign the stack.
fn prologue(n: u32) -> Vec<Instruction> {
    vec![
        Instruction::Push(Operand::Reg(Reg::Ebp)),
        Instruction::Mov(Operand::Reg(Reg::Ebp), Operand::Reg(Reg::Esp)),
        Instruction::Sub(Operand::Reg(Reg::Esp), Operand::Const(4 * n as i32)),
        Instruction::And(Operand::Reg(Reg::Esp), Operand::HexConst(0xFFFF_FFF0)),
    ]
}

/// Function epilogue: tear the frame down and return.
fn epilogue() -> Vec<Instruction> {
    vec![
        Instruction::Mov(Operand::Reg(Reg::Esp), Operand::Reg(Reg::Ebp)),
        Instruction::Pop(Operand::Reg(Reg::Ebp)),
        Instruction::Ret,
    ]
}

/// Wrap a compiled body with the prologue/epilogue calling convention,
/// reserving `n` local slots. This is the wrapper the top-level entry
/// expression uses; `compile_closure` below applies the same
/// convention to every `Lam`/`Fun` body.
pub fn wrap(n: u32, body: Vec<Instruction>) -> Vec<Instruction> {
    let mut instrs = prologue(n);
    instrs.extend(body);
    instrs.extend(epilogue());
    instrs
}

/// Load `left` into `EAX` and `right` into `EBX`, optionally asserting
/// both have type `ty` first. `Equal` skips the assertion, since it
/// compares raw representations without a type check; every other
/// binary primitive requires it. The native call stack holds `left`
/// across `right`'s load/assert since both share the same scratch
/// register.
fn load_pair(left: Operand, right: Operand, ty: Option<Ty>, config: &CodegenConfig) -> Vec<Instruction> {
    let mut instrs = Vec::new();
    match ty {
        Some(t) => instrs.extend(asserts::assert_type(left, t, config)),
        None => instrs.push(Instruction::Mov(Operand::Reg(Reg::Eax), left)),
    }
    instrs.push(Instruction::Push(Operand::Reg(Reg::Eax)));
    match ty {
        Some(t) => instrs.extend(asserts::assert_type(right, t, config)),
        None => instrs.push(Instruction::Mov(Operand::Reg(Reg::Eax), right)),
    }
    instrs.push(Instruction::Mov(Operand::Reg(Reg::Ebx), Operand::Reg(Reg::Eax)));
    instrs.push(Instruction::Pop(Operand::Reg(Reg::Eax)));
    instrs
}

fn compile_prim2(op: Prim2Op, left: Operand, right: Operand, tag_id: u32, config: &CodegenConfig) -> Vec<Instruction> {
    match op {
        Prim2Op::Plus => {
            let mut i = load_pair(left, right, Some(Ty::Number), config);
            i.push(Instruction::Add(Operand::Reg(Reg::Eax), Operand::Reg(Reg::Ebx)));
            i.push(Instruction::Jo(config.error_label(fdl_core::ErrorKind::ArithOverflow)));
            i
        }
        Prim2Op::Minus => {
            let mut i = load_pair(left, right, Some(Ty::Number), config);
            i.push(Instruction::Sub(Operand::Reg(Reg::Eax), Operand::Reg(Reg::Ebx)));
            i.push(Instruction::Jo(config.error_label(fdl_core::ErrorKind::ArithOverflow)));
            i
        }
        Prim2Op::Times => {
            let mut i = load_pair(left, right, Some(Ty::Number), config);
            i.push(Instruction::IMul(Operand::Reg(Reg::Eax), Operand::Reg(Reg::Ebx)));
            i.push(Instruction::Jo(config.error_label(fdl_core::ErrorKind::ArithOverflow)));
            // both operands were `n << 1`; the product carries an extra factor
            // of two that must be shifted back out.
            i.push(Instruction::Sar(Operand::Reg(Reg::Eax), Operand::Const(1)));
            i
        }
        Prim2Op::Less => {
            let mut i = load_pair(left, right, Some(Ty::Number), config);
            i.push(Instruction::Cmp(Operand::Reg(Reg::Eax), Operand::Reg(Reg::Ebx)));
            i.extend(asserts::bool_branch(tag_id, Cond::Lt));
            i
        }
        Prim2Op::Greater => {
            let mut i = load_pair(left, right, Some(Ty::Number), config);
            i.push(Instruction::Cmp(Operand::Reg(Reg::Eax), Operand::Reg(Reg::Ebx)));
            i.extend(asserts::bool_branch(tag_id, Cond::Gt));
            i
        }
        Prim2Op::Equal => {
            let mut i = load_pair(left, right, None, config);
            i.push(Instruction::Cmp(Operand::Reg(Reg::Eax), Operand::Reg(Reg::Ebx)));
            i.extend(asserts::bool_branch(tag_id, Cond::Eq));
            i
        }
    }
}

/// Compile a `Lam` or `Fun` node: the out-of-line body guarded by a
/// jump, followed by the closure allocation at the creation site.
/// `self_name`, when present, binds the recursive name at slot `-2`
/// in addition to seeding capture restoration from it (`Fun`'s case);
/// `Lam` passes `None`.
#[allow(clippy::too_many_arguments)]
fn compile_closure(
    env: &Env,
    self_name: Option<&str>,
    params: &[String],
    body: &Expr,
    whole_node: &Expr,
    tag: Tag,
    start_label: Label,
    end_label: Label,
    config: &CodegenConfig,
) -> Result<Vec<Instruction>, EmitError> {
    let captures = freevars::free_vars(whole_node);

    let mut inner_pairs: Vec<(String, i32)> = Vec::new();
    if let Some(name) = self_name {
        inner_pairs.push((name.to_string(), -2));
    }
    for (i, param) in params.iter().enumerate() {
        inner_pairs.push((param.clone(), -3 - i as i32));
    }
    for (i, cap) in captures.iter().enumerate() {
        inner_pairs.push((cap.clone(), 1 + i as i32));
    }
    let inner_env = Env::from_list(inner_pairs);
    let locals = inner_env.env_max() as u32 + stacksize::count_vars(body);

    let mut out = Vec::new();
    out.push(Instruction::Jmp(end_label.clone()));
    out.push(Instruction::Label(start_label.clone()));
    out.extend(prologue(locals));

    // Capture restoration: copy each captured free variable out of the
    // self-closure (always at slot -2, i.e. [ebp+8]) into its local slot.
    let self_addr = env::slot_address(-2);
    for (i, _) in captures.iter().enumerate() {
        let slot = 1 + i as i32;
        out.push(Instruction::Mov(Operand::Reg(Reg::Eax), self_addr.clone()));
        out.push(Instruction::Sub(
            Operand::Reg(Reg::Eax),
            Operand::Const(value::CLOSURE_TAG),
        ));
        out.push(Instruction::Mov(
            Operand::Reg(Reg::Eax),
            Operand::RegOffset(Reg::Eax, 4 * (slot + 1)),
        ));
        out.push(Instruction::Mov(env::slot_address(slot), Operand::Reg(Reg::Eax)));
    }

    out.extend(compile_env(&inner_env, body, config)?);
    out.extend(epilogue());
    out.push(Instruction::Label(end_label.clone()));

    // Closure allocation at the creation site, under the OUTER environment.
    let arity = params.len();
    let m = captures.len();
    let words = value::closure_alloc_words(m);
    out.extend(heap::alloc_words(words));
    out.extend(heap::tuple_write(
        &[Operand::Const(arity as i32), Operand::CodePtr(start_label)],
        0,
    ));
    let mut capture_ops = Vec::with_capacity(m);
    for name in &captures {
        let slot = env
            .lookup(name)
            .ok_or_else(|| EmitError::UnboundIdentifier {
                name: name.clone(),
                tag,
            })?;
        capture_ops.push(env::slot_address(slot));
    }
    out.extend(heap::tuple_write(&capture_ops, 2));
    if words > 2 + m {
        out.extend(heap::add_pad(2 + m));
    }
    out.extend(heap::set_tag(Reg::Eax, Ty::Closure));

    Ok(out)
}

/// Compile `e` under `env`: the recursive core of the code generator.
pub fn compile_env(env: &Env, e: &Expr, config: &CodegenConfig) -> Result<Vec<Instruction>, EmitError> {
    match e {
        Expr::Imm(imm) => Ok(vec![Instruction::Mov(Operand::Reg(Reg::Eax), imm_arg(env, imm)?)]),

        Expr::Let { bind, rhs, body, .. } => {
            let mut instrs = compile_env(env, rhs, config)?;
            let (slot, env2) = env.push(bind);
            instrs.push(Instruction::Mov(env::slot_address(slot), Operand::Reg(Reg::Eax)));
            instrs.extend(compile_env(&env2, body, config)?);
            Ok(instrs)
        }

        Expr::If {
            cond,
            then_branch,
            else_branch,
            tag,
        } => {
            let cond_op = imm_arg(env, cond)?;
            let mut instrs = asserts::assert_type(cond_op, Ty::Boolean, config);
            let on_false = labels::branch_true(tag.id);
            let done = labels::branch_done(tag.id);
            instrs.push(Instruction::Cmp(
                Operand::Reg(Reg::Eax),
                Operand::Const(value::BOOL_FALSE),
            ));
            instrs.push(Instruction::Je(on_false.clone()));
            // Condition true (not equal to false) runs `else_branch`; condition
            // false runs `then_branch`. This swap is the compiled language's
            // established behavior for `If`, not an accident of this emitter.
            instrs.extend(compile_env(env, else_branch, config)?);
            instrs.push(Instruction::Jmp(done.clone()));
            instrs.push(Instruction::Label(on_false));
            instrs.extend(compile_env(env, then_branch, config)?);
            instrs.push(Instruction::Label(done));
            Ok(instrs)
        }

        Expr::Prim1 { op, arg, tag } => {
            let arg_op = imm_arg(env, arg)?;
            match op {
                Prim1Op::Add1 => Ok(compile_prim2(
                    Prim2Op::Plus,
                    arg_op,
                    Operand::Const(value::repr_int(1)),
                    tag.id,
                    config,
                )),
                Prim1Op::Sub1 => Ok(compile_prim2(
                    Prim2Op::Minus,
                    arg_op,
                    Operand::Const(value::repr_int(1)),
                    tag.id,
                    config,
                )),
                Prim1Op::IsNum => Ok(asserts::is_type(arg_op, Ty::Number, tag.id)),
                Prim1Op::IsBool => Ok(asserts::is_type(arg_op, Ty::Boolean, tag.id)),
                Prim1Op::Print => Ok(vec![
                    Instruction::Push(arg_op),
                    Instruction::Call(Operand::CodePtr(Label("print".to_string()))),
                    Instruction::Add(Operand::Reg(Reg::Esp), Operand::Const(4)),
                ]),
            }
        }

        Expr::Prim2 { op, left, right, tag } => {
            let left_op = imm_arg(env, left)?;
            let right_op = imm_arg(env, right)?;
            Ok(compile_prim2(*op, left_op, right_op, tag.id, config))
        }

        Expr::Tuple { items, .. } => {
            let mut instrs = heap::tuple_alloc(items.len());
            let mut field_ops = Vec::with_capacity(items.len());
            for item in items {
                field_ops.push(imm_arg(env, item)?);
            }
            instrs.extend(heap::tuple_write(&field_ops, 1));
            let words = value::tuple_alloc_words(items.len());
            if words > items.len() + 1 {
                instrs.extend(heap::add_pad(items.len() + 1));
            }
            instrs.extend(heap::set_tag(Reg::Eax, Ty::Tuple));
            Ok(instrs)
        }

        Expr::GetItem { tuple, index, .. } => {
            let tuple_op = imm_arg(env, tuple)?;
            let index_op = imm_arg(env, index)?;
            let mut instrs = asserts::assert_type(tuple_op.clone(), Ty::Tuple, config);
            instrs.extend(asserts::assert_type(index_op.clone(), Ty::Number, config));
            instrs.extend(asserts::assert_bound(tuple_op.clone(), index_op.clone(), config));
            instrs.push(Instruction::Mov(Operand::Reg(Reg::Ebx), tuple_op));
            instrs.push(Instruction::Sub(
                Operand::Reg(Reg::Ebx),
                Operand::Const(value::TUPLE_TAG),
            ));
            instrs.push(Instruction::Mov(Operand::Reg(Reg::Eax), index_op));
            instrs.push(Instruction::Sar(Operand::Reg(Reg::Eax), Operand::Const(1)));
            instrs.push(Instruction::Add(Operand::Reg(Reg::Eax), Operand::Const(1)));
            instrs.push(Instruction::Mov(
                Operand::Reg(Reg::Eax),
                Operand::Indexed {
                    base: Reg::Ebx,
                    index: Reg::Eax,
                },
            ));
            Ok(instrs)
        }

        Expr::Lam { params, body, tag } => compile_closure(
            env,
            None,
            params,
            body,
            e,
            *tag,
            labels::lam_start(tag.id),
            labels::lam_end(tag.id),
            config,
        ),

        Expr::Fun {
            name,
            params,
            body,
            tag,
        } => compile_closure(
            env,
            Some(name),
            params,
            body,
            e,
            *tag,
            labels::def_start(name, tag.id),
            labels::def_end(name, tag.id),
            config,
        ),

        Expr::App { callee, args, .. } => {
            let callee_op = imm_arg(env, callee)?;
            let mut instrs = asserts::assert_type(callee_op.clone(), Ty::Closure, config);
            instrs.extend(asserts::assert_arity(callee_op.clone(), args.len(), config));
            instrs.push(Instruction::Mov(Operand::Reg(Reg::Ebx), callee_op.clone()));
            instrs.push(Instruction::Sub(
                Operand::Reg(Reg::Ebx),
                Operand::Const(value::CLOSURE_TAG),
            ));
            instrs.push(Instruction::Mov(
                Operand::Reg(Reg::Eax),
                Operand::RegOffset(Reg::Ebx, 4),
            ));
            let mut arg_ops = Vec::with_capacity(args.len());
            for arg in args {
                arg_ops.push(imm_arg(env, arg)?);
            }
            for arg_op in arg_ops.into_iter().rev() {
                instrs.push(Instruction::Push(arg_op));
            }
            instrs.push(Instruction::Push(callee_op));
            instrs.push(Instruction::Call(Operand::Reg(Reg::Eax)));
            instrs.push(Instruction::Add(
                Operand::Reg(Reg::Esp),
                Operand::Const(4 * (args.len() as i32 + 1)),
            ));
            Ok(instrs)
        }
    }
}

/// Compile `e` from an empty environment: the crate's entry point.
pub fn compile(e: &Expr, config: &CodegenConfig) -> Result<Vec<Instruction>, EmitError> {
    compile_env(&Env::empty(), e, config)
}
