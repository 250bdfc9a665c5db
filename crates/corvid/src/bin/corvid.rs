//! Command-line driver: runs a source file through the pipeline, stopping
//! early at whichever phase a flag asks to inspect.

use std::fs;
use std::process::ExitCode;

use clap::Parser;

/// Run or inspect a source file.
#[derive(Parser)]
#[command(name = "corvid")]
#[command(about = "A lexer, parser, semantic analyzer, IR generator, and VM")]
#[command(version)]
struct Cli {
    /// Source file to process.
    path: String,

    /// Show the token stream and stop.
    #[arg(short = 'l', long)]
    lex: bool,

    /// Show the parsed AST and stop.
    #[arg(short = 'a', long)]
    ast: bool,

    /// Show the generated three-address code and stop.
    #[arg(short = 'g', long)]
    ir: bool,

    /// Print each instruction as the VM executes it.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read '{}': {e}", cli.path);
            return ExitCode::FAILURE;
        }
    };

    if cli.lex {
        for token in corvid::tokenize(&source) {
            println!("{token}");
        }
        return ExitCode::SUCCESS;
    }

    if cli.ast {
        let program = match corvid::Parser::parse(&source) {
            Ok(p) => p,
            Err(e) => return report(&e, &source),
        };
        println!("{program:#?}");
        return ExitCode::SUCCESS;
    }

    if cli.ir {
        let tac = match corvid::compile(&source) {
            Ok(t) => t,
            Err(e) => return report(&e, &source),
        };
        println!("{tac}");
        return ExitCode::SUCCESS;
    }

    match corvid::run_with(&source, cli.debug) {
        Ok(Some(value)) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => report(&e, &source),
    }
}

fn report(err: &corvid::CorvidError, source: &str) -> ExitCode {
    eprintln!("{}", err.to_diagnostic(source));
    ExitCode::FAILURE
}
