//! Stack sizer
//!
//! `count_vars(e)` computes the maximum number of `let`-bindings live
//! at once while evaluating `e`. The top-level wrapper and the
//! `Lam`/`Fun` codegen case use this to size the local area of a
//! frame, on top of whatever positive slots the environment already
//! assigned.

use crate::ast::Expr;

pub fn count_vars(e: &Expr) -> u32 {
    match e {
        Expr::Let { rhs, body, .. } => count_vars(rhs).max(1 + count_vars(body)),
        Expr::If {
            then_branch,
            else_branch,
            ..
        } => count_vars(then_branch).max(count_vars(else_branch)),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ImmExpr, SourceLocation, Tag};

    fn t() -> Tag {
        Tag::new(SourceLocation::default(), 0)
    }

    fn imm_num(n: i32) -> Expr {
        Expr::Imm(ImmExpr::Number(n, t()))
    }

    #[test]
    fn immediate_is_zero() {
        assert_eq!(count_vars(&imm_num(1)), 0);
    }

    #[test]
    fn nested_lets_accumulate_depth() {
        // let a = 1 in let b = 2 in a + b  => depth 2
        let inner = Expr::Let {
            bind: "b".to_string(),
            rhs: Box::new(imm_num(2)),
            body: Box::new(imm_num(0)),
            tag: t(),
        };
        let outer = Expr::Let {
            bind: "a".to_string(),
            rhs: Box::new(imm_num(1)),
            body: Box::new(inner),
            tag: t(),
        };
        assert_eq!(count_vars(&outer), 2);
    }

    #[test]
    fn sequential_lets_in_rhs_do_not_accumulate_with_body() {
        // let a = (let b = 1 in b) in a  => rhs depth 1, body depth 0+1 = 1
        let rhs = Expr::Let {
            bind: "b".to_string(),
            rhs: Box::new(imm_num(1)),
            body: Box::new(imm_num(0)),
            tag: t(),
        };
        let outer = Expr::Let {
            bind: "a".to_string(),
            rhs: Box::new(rhs),
            body: Box::new(imm_num(0)),
            tag: t(),
        };
        assert_eq!(count_vars(&outer), 1);
    }

    #[test]
    fn if_takes_the_max_of_its_branches_and_ignores_the_test() {
        let then_branch = Expr::Let {
            bind: "a".to_string(),
            rhs: Box::new(imm_num(1)),
            body: Box::new(imm_num(0)),
            tag: t(),
        };
        let if_expr = Expr::If {
            cond: ImmExpr::Boolean(true, t()),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(imm_num(0)),
            tag: t(),
        };
        assert_eq!(count_vars(&if_expr), 1);
    }
}
