//! Lexical analysis for WLP4 source text.
//!
//! The scanner is a maximal-munch lexer over the WLP4 token set. Source is
//! consumed one physical line at a time: `//` comments are stripped before
//! lexing and a newline itself is not a token separator, so the token
//! stream behaves as if line endings were deleted outright. Two checks run
//! on top of the raw stream: integer literals must fit in a signed 32-bit
//! word, and tokens that the grammar requires whitespace between (adjacent
//! words, adjacent comparison operators) must have a space or tab between
//! them on their own lines.

pub mod token;

use crate::diag::Diag;
use logos::Logos;
use smol_str::SmolStr;
use token::{Token, TokenKind};

/// The largest integer literal the language admits.
const MAX_LITERAL: u64 = i32::MAX as u64;

/// Scans WLP4 source text into a token stream.
///
/// The first lexical error aborts the scan.
pub fn scan(source: &str) -> Result<Vec<Token>, Diag> {
    let mut tokens = Vec::new();
    // separated[i] records whether whitespace occurred between token i and
    // its predecessor. Newlines do not count.
    let mut separated = Vec::new();
    let mut gap = false;
    let mut offset = 0usize;

    for raw in source.split_inclusive('\n') {
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let stripped = match line.find("//") {
            Some(comment) => &line[..comment],
            None => line,
        };

        let mut cursor = 0usize;
        for (result, span) in TokenKind::lexer(stripped).spanned() {
            let kind = result.map_err(|()| {
                Diag::error("unrecognized character")
                    .with_label(span.start + offset..span.end + offset, "no token starts here")
                    .with_code("scan::invalid_character")
            })?;

            if span.start > cursor {
                gap = true;
            }
            cursor = span.end;

            let lexeme = SmolStr::new(&stripped[span.clone()]);
            if kind == TokenKind::Num && !literal_in_range(&lexeme) {
                return Err(Diag::error(format!("integer literal {lexeme} out of range"))
                    .with_label(span.start + offset..span.end + offset, "exceeds 2^31 - 1")
                    .with_code("scan::literal_range"));
            }

            tokens.push(Token::new(kind, lexeme, span.start + offset..span.end + offset));
            separated.push(gap);
            gap = false;
        }

        // Trailing whitespace, or a whitespace-only line, separates; a
        // completely empty line does not.
        if cursor < stripped.len() {
            gap = true;
        }

        offset += raw.len();
    }

    check_separation(&tokens, &separated)?;
    Ok(tokens)
}

fn literal_in_range(lexeme: &str) -> bool {
    if lexeme.len() > 10 {
        return false;
    }
    lexeme
        .parse::<u64>()
        .map(|value| value <= MAX_LITERAL)
        .unwrap_or(false)
}

/// Rejects token pairs the grammar requires whitespace between.
///
/// The check is on token kinds over the whole accumulated stream: a number
/// running into a word (`123abc`), a zero-led number (`0123`), or stacked
/// comparison operators (`===`) are ambiguous without a separator, and a
/// bare newline is not a separator.
fn check_separation(tokens: &[Token], separated: &[bool]) -> Result<(), Diag> {
    for index in 1..tokens.len() {
        if separated[index] {
            continue;
        }
        let (first, second) = (&tokens[index - 1], &tokens[index]);

        let clash = (first.kind.is_wordlike() && second.kind.is_wordlike())
            || (first.kind.is_comparison() && second.kind.is_comparison());

        if clash {
            return Err(Diag::error(format!(
                "tokens `{}` and `{}` require whitespace between them",
                first.lexeme, second.lexeme
            ))
            .with_label(first.span.start..second.span.end, "ambiguous juxtaposition")
            .with_code("scan::missing_whitespace"));
        }
    }

    Ok(())
}
