//! A minimal s-expression reader for already-ANF-shaped programs
//!
//! This stands in for the external normalizer `codegen.rs` otherwise
//! assumes upstream (`ast.rs`'s doc comment): it reads a small
//! parenthesized surface syntax directly into a tagged [`Expr`] tree,
//! minting each node's tag itself since nothing else in this crate
//! does. The surface syntax requires every compound sub-expression to
//! already be an immediate; it does no ANF conversion of its own.
//!
//! ```text
//! <expr> ::= <imm>
//!          | ( let ( ( id <expr> ) ) <expr> )
//!          | ( if <imm> <expr> <expr> )
//!          | ( add1 <imm> ) | ( sub1 <imm> )
//!          | ( isnum <imm> ) | ( isbool <imm> ) | ( print <imm> )
//!          | ( + <imm> <imm> ) | ( - <imm> <imm> ) | ( * <imm> <imm> )
//!          | ( < <imm> <imm> ) | ( > <imm> <imm> ) | ( = <imm> <imm> )
//!          | ( tuple <imm>* )
//!          | ( get <imm> <imm> )
//!          | ( lambda ( id* ) <expr> )
//!          | ( fun id ( id* ) <expr> )
//!          | ( app <imm> <imm>* )
//! <imm>  ::= <number> | true | false | id
//! ```
//!
//! `;` starts a line comment.

use crate::ast::{AstError, Expr, ImmExpr, Param, Prim1Op, Prim2Op, SourceLocation, Tag};

#[derive(Debug, Clone)]
struct Token {
    text: String,
    line: usize,
    col: usize,
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = (0usize, 0usize);
    let mut line = 0;
    let mut col = 0;
    let mut in_comment = false;

    let flush = |current: &mut String, tokens: &mut Vec<Token>, start: (usize, usize)| {
        if !current.is_empty() {
            tokens.push(Token {
                text: std::mem::take(current),
                line: start.0,
                col: start.1,
            });
        }
    };

    for ch in source.chars() {
        if in_comment {
            if ch == '\n' {
                in_comment = false;
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
            continue;
        }
        match ch {
            ';' => {
                flush(&mut current, &mut tokens, start);
                in_comment = true;
                col += 1;
            }
            '(' | ')' => {
                flush(&mut current, &mut tokens, start);
                tokens.push(Token {
                    text: ch.to_string(),
                    line,
                    col,
                });
                col += 1;
            }
            c if c.is_whitespace() => {
                flush(&mut current, &mut tokens, start);
                if c == '\n' {
                    line += 1;
                    col = 0;
                } else {
                    col += 1;
                }
            }
            c => {
                if current.is_empty() {
                    start = (line, col);
                }
                current.push(c);
                col += 1;
            }
        }
    }
    flush(&mut current, &mut tokens, start);
    tokens
}

/// Reads s-expression source into a tagged ANF [`Expr`] tree, minting
/// tag IDs in the order nodes are read.
pub struct Reader {
    tokens: Vec<Token>,
    pos: usize,
    next_tag: u32,
}

impl Reader {
    pub fn new(source: &str) -> Self {
        Reader {
            tokens: tokenize(source),
            pos: 0,
            next_tag: 0,
        }
    }

    /// Read a single top-level expression; error if anything is left over.
    pub fn read_program(&mut self) -> Result<Expr, AstError> {
        let e = self.read_expr()?;
        if !self.is_at_end() {
            return Err(AstError::TrailingInput {
                found: self.current().to_string(),
                loc: self.current_loc(),
            });
        }
        Ok(e)
    }

    fn mint_tag(&mut self, loc: SourceLocation) -> Tag {
        let id = self.next_tag;
        self.next_tag += 1;
        Tag::new(loc, id)
    }

    fn read_expr(&mut self) -> Result<Expr, AstError> {
        let loc = self.current_loc();
        if self.check("(") {
            self.advance();
            let head_loc = self.current_loc();
            let head = self
                .advance()
                .ok_or(AstError::UnexpectedEof { loc: head_loc })?
                .clone();
            let e = match head.as_str() {
                "let" => self.read_let(loc),
                "if" => self.read_if(loc),
                "add1" => self.read_prim1(Prim1Op::Add1, loc),
                "sub1" => self.read_prim1(Prim1Op::Sub1, loc),
                "isnum" => self.read_prim1(Prim1Op::IsNum, loc),
                "isbool" => self.read_prim1(Prim1Op::IsBool, loc),
                "print" => self.read_prim1(Prim1Op::Print, loc),
                "+" => self.read_prim2(Prim2Op::Plus, loc),
                "-" => self.read_prim2(Prim2Op::Minus, loc),
                "*" => self.read_prim2(Prim2Op::Times, loc),
                "<" => self.read_prim2(Prim2Op::Less, loc),
                ">" => self.read_prim2(Prim2Op::Greater, loc),
                "=" => self.read_prim2(Prim2Op::Equal, loc),
                "tuple" => self.read_tuple(loc),
                "get" => self.read_get(loc),
                "lambda" => self.read_lambda(loc),
                "fun" => self.read_fun(loc),
                "app" => self.read_app(loc),
                other => Err(AstError::UnknownForm {
                    name: other.to_string(),
                    loc,
                }),
            }?;
            self.expect(")")?;
            Ok(e)
        } else {
            Ok(Expr::Imm(self.read_imm()?))
        }
    }

    fn read_imm(&mut self) -> Result<ImmExpr, AstError> {
        let loc = self.current_loc();
        if self.check("(") {
            return Err(AstError::NotImmediate { loc });
        }
        if self.check(")") || self.is_at_end() {
            return Err(AstError::UnexpectedEof { loc });
        }
        let tag = self.mint_tag(loc);
        let token = self
            .advance()
            .ok_or(AstError::UnexpectedEof { loc })?
            .clone();
        if token == "true" {
            return Ok(ImmExpr::Boolean(true, tag));
        }
        if token == "false" {
            return Ok(ImmExpr::Boolean(false, tag));
        }
        if let Ok(n) = token.parse::<i32>() {
            return Ok(ImmExpr::Number(n, tag));
        }
        Ok(ImmExpr::Id(token, tag))
    }

    fn read_let(&mut self, loc: SourceLocation) -> Result<Expr, AstError> {
        self.expect("(")?;
        self.expect("(")?;
        let bind_loc = self.current_loc();
        let bind = self
            .advance()
            .ok_or(AstError::UnexpectedEof { loc: bind_loc })?
            .clone();
        let rhs = self.read_expr()?;
        self.expect(")")?;
        self.expect(")")?;
        let body = self.read_expr()?;
        Ok(Expr::Let {
            bind,
            rhs: Box::new(rhs),
            body: Box::new(body),
            tag: self.mint_tag(loc),
        })
    }

    fn read_if(&mut self, loc: SourceLocation) -> Result<Expr, AstError> {
        let cond = self.read_imm()?;
        let then_branch = self.read_expr()?;
        let else_branch = self.read_expr()?;
        Ok(Expr::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            tag: self.mint_tag(loc),
        })
    }

    fn read_prim1(&mut self, op: Prim1Op, loc: SourceLocation) -> Result<Expr, AstError> {
        let arg = self.read_imm()?;
        Ok(Expr::Prim1 {
            op,
            arg,
            tag: self.mint_tag(loc),
        })
    }

    fn read_prim2(&mut self, op: Prim2Op, loc: SourceLocation) -> Result<Expr, AstError> {
        let left = self.read_imm()?;
        let right = self.read_imm()?;
        Ok(Expr::Prim2 {
            op,
            left,
            right,
            tag: self.mint_tag(loc),
        })
    }

    fn read_tuple(&mut self, loc: SourceLocation) -> Result<Expr, AstError> {
        let mut items = Vec::new();
        while !self.check(")") {
            items.push(self.read_imm()?);
        }
        Ok(Expr::Tuple {
            items,
            tag: self.mint_tag(loc),
        })
    }

    fn read_get(&mut self, loc: SourceLocation) -> Result<Expr, AstError> {
        let tuple = self.read_imm()?;
        let index = self.read_imm()?;
        Ok(Expr::GetItem {
            tuple,
            index,
            tag: self.mint_tag(loc),
        })
    }

    fn read_params(&mut self) -> Result<Vec<Param>, AstError> {
        self.expect("(")?;
        let mut params = Vec::new();
        while !self.check(")") {
            let loc = self.current_loc();
            let name = self
                .advance()
                .ok_or(AstError::UnexpectedEof { loc })?
                .clone();
            params.push(name);
        }
        self.expect(")")?;
        Ok(params)
    }

    fn read_lambda(&mut self, loc: SourceLocation) -> Result<Expr, AstError> {
        let params = self.read_params()?;
        let body = self.read_expr()?;
        Ok(Expr::Lam {
            params,
            body: Box::new(body),
            tag: self.mint_tag(loc),
        })
    }

    fn read_fun(&mut self, loc: SourceLocation) -> Result<Expr, AstError> {
        let name_loc = self.current_loc();
        let name = self
            .advance()
            .ok_or(AstError::UnexpectedEof { loc: name_loc })?
            .clone();
        let params = self.read_params()?;
        let body = self.read_expr()?;
        Ok(Expr::Fun {
            name,
            params,
            body: Box::new(body),
            tag: self.mint_tag(loc),
        })
    }

    fn read_app(&mut self, loc: SourceLocation) -> Result<Expr, AstError> {
        let callee = self.read_imm()?;
        let mut args = Vec::new();
        while !self.check(")") {
            args.push(self.read_imm()?);
        }
        Ok(Expr::App {
            callee,
            args,
            tag: self.mint_tag(loc),
        })
    }

    fn current_loc(&self) -> SourceLocation {
        match self.tokens.get(self.pos) {
            Some(t) => SourceLocation::new(t.line, t.col),
            None => SourceLocation::default(),
        }
    }

    fn current(&self) -> &str {
        self.tokens.get(self.pos).map(|t| t.text.as_str()).unwrap_or("")
    }

    fn check(&self, expected: &str) -> bool {
        self.current() == expected
    }

    fn advance(&mut self) -> Option<&String> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(&tok.text)
    }

    fn expect(&mut self, expected: &str) -> Result<(), AstError> {
        let loc = self.current_loc();
        if self.check(expected) {
            self.advance();
            Ok(())
        } else {
            Err(AstError::ExpectedToken {
                expected: expected.to_string(),
                found: self.current().to_string(),
                loc,
            })
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// Read `source` as a single top-level ANF expression.
pub fn parse(source: &str) -> Result<Expr, AstError> {
    Reader::new(source).read_program()
}
