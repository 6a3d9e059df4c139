//! FDL Compiler CLI
//!
//! Command-line interface for compiling `.fdl` programs (in the
//! harness surface syntax, `fdlc::sexpr`) to a textual instruction
//! listing.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use fdl_core::asm;
use fdlc::ast::{Expr, ImmExpr, SourceLocation, Tag};
use fdlc::config::CodegenConfig;
use fdlc::{codegen, sexpr, stacksize};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "fdlc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "FDL compiler - compile .fdl programs to an abstract instruction listing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .fdl source file to an instruction listing
    Build {
        /// Input .fdl source file
        input: PathBuf,

        /// Output listing path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override an error stub's label, e.g. `non_number=rt_non_number`
        #[arg(long = "error-label", value_name = "KIND=LABEL")]
        error_labels: Vec<String>,
    },

    /// Print the instruction listing for a built-in ANF fixture
    Dump {
        /// Name of the fixture to dump (defaults to the arithmetic one)
        #[arg(value_enum)]
        fixture: Option<Fixture>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum Fixture {
    /// `let x = 1 in x + 2`
    Arithmetic,
    /// `if 1 < 2 then 10 else 20` (note the documented then/else swap)
    Conditional,
    /// `let t = (1, 2, 3) in t[1]`
    Tuple,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            error_labels,
        } => run_build(&input, output.as_deref(), &error_labels),
        Commands::Dump { fixture } => run_dump(fixture.unwrap_or(Fixture::Arithmetic)),
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "fdlc", &mut io::stdout());
}

fn parse_error_label(spec: &str) -> Result<(fdl_core::ErrorKind, String), String> {
    let (kind_name, label) = spec
        .split_once('=')
        .ok_or_else(|| format!("malformed --error-label '{spec}', expected KIND=LABEL"))?;
    let kind = match kind_name {
        "non_number" => fdl_core::ErrorKind::NonNumber,
        "non_boolean" => fdl_core::ErrorKind::NonBoolean,
        "non_tuple" => fdl_core::ErrorKind::NonTuple,
        "non_closure" => fdl_core::ErrorKind::NonClosure,
        "arith_overflow" => fdl_core::ErrorKind::ArithOverflow,
        "index_low" => fdl_core::ErrorKind::IndexLow,
        "index_high" => fdl_core::ErrorKind::IndexHigh,
        "arity" => fdl_core::ErrorKind::Arity,
        other => return Err(format!("unknown error-stub kind '{other}'")),
    };
    Ok((kind, label.to_string()))
}

fn build_config(error_labels: &[String]) -> CodegenConfig {
    let mut config = CodegenConfig::new();
    for spec in error_labels {
        match parse_error_label(spec) {
            Ok((kind, label)) => match config.with_error_label(kind, label) {
                Ok(c) => config = c,
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
    config
}

fn run_build(input: &std::path::Path, output: Option<&std::path::Path>, error_labels: &[String]) {
    let source = match std::fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {e}", input.display());
            process::exit(1);
        }
    };

    let expr = match sexpr::parse(&source) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Parse error in {}: {e}", input.display());
            process::exit(1);
        }
    };

    let config = build_config(error_labels);
    let listing = match compile_and_render(&expr, &config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Compile error in {}: {e}", input.display());
            process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &listing) {
                eprintln!("Error writing {}: {e}", path.display());
                process::exit(1);
            }
            println!("Compiled {} -> {}", input.display(), path.display());
        }
        None => println!("{listing}"),
    }
}

fn compile_and_render(expr: &Expr, config: &CodegenConfig) -> Result<String, fdlc::EmitError> {
    let locals = stacksize::count_vars(expr);
    let body = codegen::compile(expr, config)?;
    Ok(asm::render(&codegen::wrap(locals, body)))
}

fn run_dump(fixture: Fixture) {
    let expr = fixture_expr(fixture);
    let config = CodegenConfig::new();
    match compile_and_render(&expr, &config) {
        Ok(listing) => println!("{listing}"),
        Err(e) => {
            eprintln!("Compile error: {e}");
            process::exit(1);
        }
    }
}

fn t(id: u32) -> Tag {
    Tag::new(SourceLocation::default(), id)
}

fn fixture_expr(fixture: Fixture) -> Expr {
    match fixture {
        Fixture::Arithmetic => Expr::Let {
            bind: "x".to_string(),
            rhs: Box::new(Expr::Imm(ImmExpr::Number(1, t(0)))),
            body: Box::new(Expr::Prim2 {
                op: fdlc::ast::Prim2Op::Plus,
                left: ImmExpr::Id("x".to_string(), t(1)),
                right: ImmExpr::Number(2, t(2)),
                tag: t(3),
            }),
            tag: t(4),
        },
        Fixture::Conditional => Expr::Let {
            bind: "t".to_string(),
            rhs: Box::new(Expr::Prim2 {
                op: fdlc::ast::Prim2Op::Less,
                left: ImmExpr::Number(1, t(0)),
                right: ImmExpr::Number(2, t(1)),
                tag: t(2),
            }),
            body: Box::new(Expr::If {
                cond: ImmExpr::Id("t".to_string(), t(3)),
                then_branch: Box::new(Expr::Imm(ImmExpr::Number(10, t(4)))),
                else_branch: Box::new(Expr::Imm(ImmExpr::Number(20, t(5)))),
                tag: t(6),
            }),
            tag: t(7),
        },
        Fixture::Tuple => Expr::Let {
            bind: "t".to_string(),
            rhs: Box::new(Expr::Tuple {
                items: vec![
                    ImmExpr::Number(1, t(0)),
                    ImmExpr::Number(2, t(1)),
                    ImmExpr::Number(3, t(2)),
                ],
                tag: t(3),
            }),
            body: Box::new(Expr::GetItem {
                tuple: ImmExpr::Id("t".to_string(), t(4)),
                index: ImmExpr::Number(1, t(5)),
                tag: t(6),
            }),
            tag: t(7),
        },
    }
}
