//! The embeddable entry point: source text in, a value out. Ties together
//! every phase (lex is implicit inside the parser, parse, analyze, lower,
//! execute) the way a one-shot script runner would.

use crate::ast::Program;
use crate::error::Result;
use crate::irgen;
use crate::parser::Parser;
use crate::sema::Analyzer;
use crate::tac::TacProgram;
use crate::value::Value;
use crate::vm;

/// Parses and type-checks `source`, returning the checked AST. Useful on its
/// own for an `-a` "print the AST" mode.
pub fn parse_and_check(source: &str) -> Result<Program> {
    let program = Parser::parse(source)?;
    Analyzer::analyze(program)
}

/// Parses, checks, and lowers `source` to three-address code without
/// running it. Useful on its own for a `-g` "print the IR" mode.
pub fn compile(source: &str) -> Result<TacProgram> {
    let program = parse_and_check(source)?;
    irgen::generate(&program)
}

/// Lowers an already type-checked [`Program`] to three-address code.
/// Exposed separately from [`compile`] so callers that already hold a
/// checked AST (or want to exercise IR generation's own error paths
/// directly) don't have to re-parse.
pub fn compile_checked(program: &Program) -> Result<TacProgram> {
    irgen::generate(program)
}

/// Compiles and runs `source` end to end, returning `main`'s result.
pub fn run(source: &str) -> Result<Option<Value>> {
    run_with(source, false)
}

/// Like [`run`], but optionally traces each executed instruction to stderr.
pub fn run_with(source: &str, debug: bool) -> Result<Option<Value>> {
    let tac = compile(source)?;
    vm::run_with(tac, debug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_a_complete_program() {
        let result = run("fn main() -> int { return 6 * 7; }").unwrap();
        assert_eq!(result, Some(Value::Int(42)));
    }

    #[test]
    fn rejects_type_errors_before_lowering() {
        assert!(parse_and_check("fn main() -> int { return \"nope\"; }").is_err());
    }

    #[test]
    fn compile_exposes_ir_without_running_it() {
        let tac = compile("fn main() -> int { return 1; }").unwrap();
        assert!(tac.to_string().contains("main:"));
    }
}
