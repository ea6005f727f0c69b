//! Assembler stage: assembly text on stdin, raw big-endian words on stdout.
//!
//! A tokenization failure exits 1; validation and resolution errors report
//! `ERROR` and exit 0, matching the other stages.

use std::io::{Read, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut source = String::new();
    if std::io::stdin().read_to_string(&mut source).is_err() {
        eprintln!("ERROR: stdin is not valid text");
        return ExitCode::FAILURE;
    }

    match wlp4c::assemble(&source) {
        Ok(image) => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            if out.write_all(&image).is_err() || out.flush().is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(diag) => {
            eprintln!("ERROR: {diag}");
            if diag.code.as_deref() == Some("asm::scan_failure") {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}
