//! Scanner stage: WLP4 source on stdin, `<KIND> <lexeme>` lines on stdout.

use std::io::{Read, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut source = String::new();
    if std::io::stdin().read_to_string(&mut source).is_err() {
        eprintln!("ERROR: stdin is not valid text");
        return ExitCode::FAILURE;
    }

    match wlp4c::scan(&source) {
        Ok(tokens) => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for token in tokens {
                if writeln!(out, "{token}").is_err() {
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(diag) => {
            eprintln!("ERROR: {diag}");
            ExitCode::FAILURE
        }
    }
}
