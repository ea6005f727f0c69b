//! Parser stage: token lines on stdin, a derivation tree on stdout.
//!
//! The LR(1) tables are read from `grammar.txt` in the working directory.
//! A syntax error reports `ERROR at <k>` and still exits 0, matching the
//! rest of the pipeline's expectations; only a missing or malformed table
//! file is a hard failure.

use smol_str::SmolStr;
use std::io::Read;
use std::process::ExitCode;
use wlp4c::{ParseTables, Parser};

fn main() -> ExitCode {
    let table_text = match std::fs::read_to_string("grammar.txt") {
        Ok(text) => text,
        Err(error) => {
            eprintln!("ERROR: cannot read grammar.txt: {error}");
            return ExitCode::FAILURE;
        }
    };
    let tables = match ParseTables::parse(&table_text) {
        Ok(tables) => tables,
        Err(diag) => {
            eprintln!("ERROR: {diag}");
            return ExitCode::FAILURE;
        }
    };

    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        eprintln!("ERROR: stdin is not valid text");
        return ExitCode::FAILURE;
    }

    let mut tokens: Vec<(SmolStr, SmolStr)> = Vec::new();
    for line in input.lines() {
        let mut parts = line.split_whitespace();
        let (Some(kind), Some(lexeme), None) = (parts.next(), parts.next(), parts.next()) else {
            eprintln!("ERROR: malformed token line `{line}`");
            return ExitCode::FAILURE;
        };
        tokens.push((SmolStr::new(kind), SmolStr::new(lexeme)));
    }

    match Parser::new(&tables).parse(&tokens) {
        Ok(tree) => {
            print!("{tree}");
            ExitCode::SUCCESS
        }
        Err(diag) => {
            eprintln!("ERROR {}", diag.message);
            ExitCode::SUCCESS
        }
    }
}
