use std::{fs::read_to_string, path::PathBuf, process::ExitCode, rc::Rc, time::Instant};

use anyhow::Context;
use clap::Parser as _;
use pyfront::{
    display_error,
    errors::errors::Error,
    lexer::lexer::tokenize,
    parser::parser::{parse, Module},
    symbol_table::symbol_table::{ScopeId, SymbolTable},
    type_checker::type_checker::type_check,
};

/// Tokenizes, parses and type checks a source file.
#[derive(clap::Parser)]
struct Args {
    /// File to check.
    path: PathBuf,
    /// Print how long each stage took.
    #[arg(long)]
    timings: bool,
    /// Print the token stream.
    #[arg(long)]
    dump_tokens: bool,
    /// Print every user-declared symbol with its type.
    #[arg(long)]
    dump_symbols: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let source = read_to_string(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let file_name = args
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.path.display().to_string());

    match run(&args, &source, file_name) {
        Ok(module) => {
            println!("Parsed {} lines", module.lines);
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            display_error(&error, &source, &args.path);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run(args: &Args, source: &str, file_name: String) -> Result<Module, Error> {
    let file = Rc::new(file_name);

    let start = Instant::now();
    let tokens = tokenize(source, Rc::clone(&file))?;
    if args.timings {
        println!("Tokenized in {:?}", start.elapsed());
    }
    if args.dump_tokens {
        for token in &tokens {
            println!(
                "{}:{} {:?} {:?}",
                token.line, token.column, token.kind, token.value
            );
        }
    }

    let parse_start = Instant::now();
    let mut module = parse(tokens, file)?;
    if args.timings {
        println!("Parsed in {:?}", parse_start.elapsed());
    }

    let type_check_start = Instant::now();
    type_check(&mut module)?;
    if args.timings {
        println!("Type checked in {:?}", type_check_start.elapsed());
        println!("Total time: {:?}", start.elapsed());
    }

    if args.dump_symbols {
        dump_scope(&module.symbols, module.symbols.root());
    }

    Ok(module)
}

/// Prints the entries of `scope` and, depth first, of the scopes they open.
fn dump_scope(symbols: &SymbolTable, scope: ScopeId) {
    for entry in symbols.entries_in_scope(scope) {
        if symbols.is_builtin(entry) {
            continue;
        }
        println!(
            "{:?} {}: {}",
            symbols.entry(entry).namespace,
            symbols.qualified_name(entry),
            symbols.value(entry).render(symbols)
        );
        dump_scope(symbols, entry);
    }
}
