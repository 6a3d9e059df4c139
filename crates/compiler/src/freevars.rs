//! Free-variable analysis
//!
//! `free_vars(e)` returns the identifiers `e` references but does not
//! bind, as a **sorted** sequence. Sorting is load bearing, not
//! cosmetic: the closure-creation site (`codegen.rs`'s `Lam`/`Fun`
//! case, which allocates the closure tuple) and the closure body's
//! prologue (which restores captures into local slots) must agree on
//! capture order without passing information between them, and
//! sorting the identifier names is how that agreement stays
//! deterministic.

use crate::ast::{Expr, ImmExpr};
use std::collections::BTreeSet;

/// The free variables of `e`, lexicographically sorted and deduplicated.
pub fn free_vars(e: &Expr) -> Vec<String> {
    let mut set = BTreeSet::new();
    collect(e, &mut set);
    set.into_iter().collect()
}

fn collect(e: &Expr, out: &mut BTreeSet<String>) {
    match e {
        Expr::Imm(imm) => collect_imm(imm, out),
        Expr::Let { bind, rhs, body, .. } => {
            collect(rhs, out);
            out.extend(bound_complement(body, std::slice::from_ref(bind)));
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            collect_imm(cond, out);
            collect(then_branch, out);
            collect(else_branch, out);
        }
        Expr::Prim1 { arg, .. } => collect_imm(arg, out),
        Expr::Prim2 { left, right, .. } => {
            collect_imm(left, out);
            collect_imm(right, out);
        }
        Expr::Tuple { items, .. } => {
            for item in items {
                collect_imm(item, out);
            }
        }
        Expr::GetItem { tuple, index, .. } => {
            collect_imm(tuple, out);
            collect_imm(index, out);
        }
        Expr::Lam { params, body, .. } => out.extend(bound_complement(body, params)),
        Expr::Fun {
            name, params, body, ..
        } => {
            let mut bound: Vec<String> = params.clone();
            bound.push(name.clone());
            out.extend(bound_complement(body, &bound));
        }
        Expr::App { callee, args, .. } => {
            collect_imm(callee, out);
            for arg in args {
                collect_imm(arg, out);
            }
        }
    }
}

/// Free variables of `e`, minus everything in `bound`.
fn bound_complement(e: &Expr, bound: &[String]) -> BTreeSet<String> {
    let mut inner = BTreeSet::new();
    collect(e, &mut inner);
    for name in bound {
        inner.remove(name);
    }
    inner
}

fn collect_imm(imm: &ImmExpr, out: &mut BTreeSet<String>) {
    if let ImmExpr::Id(name, _) = imm {
        out.insert(name.clone());
    }
}
