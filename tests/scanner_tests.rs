//! Scanner integration tests over whole programs.

mod common;

use wlp4c::scan;

const SOURCE: &str = "\
// sums the first n naturals
int wain(int* arr, int n) {
    int i = 0;
    int total = 0;
    while (i < n) {
        total = total + *(arr + i);
        i = i + 1;
    }
    return total;
}
";

#[test]
fn scans_a_full_program() {
    let tokens = scan(SOURCE).expect("program scans");
    let wire: Vec<String> = tokens.iter().map(ToString::to_string).collect();

    assert_eq!(wire[0], "INT int");
    assert_eq!(wire[1], "WAIN wain");
    assert!(wire.contains(&"STAR *".to_string()));
    assert!(wire.contains(&"WHILE while".to_string()));
    assert!(wire.contains(&"ID total".to_string()));
    // The comment never reaches the token stream.
    assert!(!wire.iter().any(|line| line.contains("sums")));
}

#[test]
fn token_stream_reprint_is_stable() {
    // Scanning a normalized, single-space-separated stream of lexemes and
    // reprinting the lexemes yields the same stream.
    let tokens = scan(SOURCE).expect("program scans");
    let normalized = tokens
        .iter()
        .map(|token| token.lexeme.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let rescanned = scan(&normalized).expect("normalized stream scans");
    assert_eq!(rescanned.len(), tokens.len());
    for (before, after) in tokens.iter().zip(&rescanned) {
        assert_eq!(before.kind, after.kind);
        assert_eq!(before.lexeme, after.lexeme);
    }
}

#[test]
fn first_error_aborts() {
    let err = scan("int wain # nope").unwrap_err();
    assert_eq!(err.code.as_deref(), Some("scan::invalid_character"));
}

#[test]
fn literal_range_is_enforced_in_context() {
    assert!(scan("int x = 2147483647 ;").is_ok());
    let err = scan("int x = 2147483648 ;").unwrap_err();
    assert_eq!(err.code.as_deref(), Some("scan::literal_range"));
}

#[test]
fn adjacency_rules_apply_across_the_stream() {
    // `return0` is one identifier by maximal munch; `0return` is a number
    // running into a word and needs whitespace.
    assert!(scan("return0").is_ok());
    assert!(scan("0return").is_err());
    assert!(scan("a<=b").is_ok());
    assert!(scan("a <= = b").is_ok());
    assert!(scan("a <== b").is_err());
}

#[test]
fn adjacency_rules_cross_line_boundaries() {
    // A bare newline is not a separator: lines are scanned independently
    // and their tokens concatenate with nothing between them.
    let err = scan("return\n0").unwrap_err();
    assert_eq!(err.code.as_deref(), Some("scan::missing_whitespace"));
    assert!(scan("return \n0").is_ok());
    assert!(scan("return\n 0").is_ok());

    // The same program with the line break inside a keyword/identifier
    // boundary is rejected even though each line scans cleanly alone.
    assert!(scan("int wain(int a, int\nb) { return a; }").is_err());
    assert!(scan("int wain(int a, int\n b) { return a; }").is_ok());
}
