//! Analyzer and generator stage: a derivation tree on stdin, assembly on
//! stdout. Empty input produces empty output; any semantic failure reports
//! `ERROR` and exits 0.

use std::io::Read;
use std::process::ExitCode;
use wlp4c::{ParseTree, translate};

fn main() -> ExitCode {
    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        eprintln!("ERROR: stdin is not valid text");
        return ExitCode::FAILURE;
    }

    if input.trim().is_empty() {
        return ExitCode::SUCCESS;
    }

    let result = ParseTree::read(&input).and_then(|tree| translate(&tree));
    match result {
        Ok(assembly) => {
            print!("{assembly}");
            ExitCode::SUCCESS
        }
        Err(diag) => {
            eprintln!("ERROR: {diag}");
            ExitCode::SUCCESS
        }
    }
}
