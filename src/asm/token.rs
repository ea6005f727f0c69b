//! Line tokenization for assembly input.
//!
//! Assembly is line-oriented: labels and at most one instruction per line.
//! Each line is lexed independently; spans are offset so they point into the
//! whole input text for diagnostics.

use crate::diag::{Diag, Span};
use logos::Logos;
use smol_str::SmolStr;

/// The kind of an assembly token.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
pub enum AsmTokenKind {
    /// The `.word` directive.
    #[token(".word")]
    Word,

    /// The `.import` directive.
    #[token(".import")]
    Import,

    /// A label definition, lexeme includes the trailing colon.
    #[regex("[a-zA-Z][a-zA-Z0-9]*:")]
    Label,

    /// An opcode or symbol reference.
    #[regex("[a-zA-Z][a-zA-Z0-9]*")]
    Id,

    /// A register reference, lexeme includes the leading `$`.
    #[regex(r"\$[0-9]+")]
    Register,

    /// A decimal integer, possibly negative.
    #[regex("-?[0-9]+")]
    Int,

    /// A hexadecimal integer.
    #[regex("0x[0-9a-fA-F]+")]
    HexInt,

    /// `,`
    #[token(",")]
    Comma,

    /// `(`
    #[token("(")]
    LParen,

    /// `)`
    #[token(")")]
    RParen,
}

/// A token on one assembly line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmToken {
    /// The token kind.
    pub kind: AsmTokenKind,
    /// The verbatim lexeme.
    pub lexeme: SmolStr,
    /// Byte range in the whole input text.
    pub span: Span,
}

/// Lexes one line; `offset` is the line's byte position in the whole input.
pub fn scan_line(line: &str, offset: usize) -> Result<Vec<AsmToken>, Diag> {
    let mut tokens = Vec::new();
    for (result, span) in AsmTokenKind::lexer(line).spanned() {
        let span = span.start + offset..span.end + offset;
        let kind = result.map_err(|()| {
            Diag::error("unrecognized assembly token")
                .with_label(span.clone(), "no token starts here")
                .with_code("asm::scan_failure")
        })?;
        tokens.push(AsmToken {
            kind,
            lexeme: SmolStr::new(&line[span.start - offset..span.end - offset]),
            span,
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<AsmTokenKind> {
        scan_line(line, 0)
            .expect("line lexes")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn lexes_three_register_instruction() {
        assert_eq!(
            kinds("add $3, $5, $3"),
            [
                AsmTokenKind::Id,
                AsmTokenKind::Register,
                AsmTokenKind::Comma,
                AsmTokenKind::Register,
                AsmTokenKind::Comma,
                AsmTokenKind::Register,
            ]
        );
    }

    #[test]
    fn lexes_store_with_parens() {
        assert_eq!(
            kinds("sw $31, -4($30)"),
            [
                AsmTokenKind::Id,
                AsmTokenKind::Register,
                AsmTokenKind::Comma,
                AsmTokenKind::Int,
                AsmTokenKind::LParen,
                AsmTokenKind::Register,
                AsmTokenKind::RParen,
            ]
        );
    }

    #[test]
    fn label_beats_plain_identifier() {
        assert_eq!(kinds("loop:"), [AsmTokenKind::Label]);
        assert_eq!(kinds("loop"), [AsmTokenKind::Id]);
        assert_eq!(
            kinds("loop: beq $0, $0, loop"),
            [
                AsmTokenKind::Label,
                AsmTokenKind::Id,
                AsmTokenKind::Register,
                AsmTokenKind::Comma,
                AsmTokenKind::Register,
                AsmTokenKind::Comma,
                AsmTokenKind::Id,
            ]
        );
    }

    #[test]
    fn hex_beats_decimal_prefix() {
        assert_eq!(kinds(".word 0xffff"), [AsmTokenKind::Word, AsmTokenKind::HexInt]);
        assert_eq!(kinds(".word 255"), [AsmTokenKind::Word, AsmTokenKind::Int]);
        assert_eq!(kinds(".word -1"), [AsmTokenKind::Word, AsmTokenKind::Int]);
    }

    #[test]
    fn import_directive() {
        assert_eq!(kinds(".import init"), [AsmTokenKind::Import, AsmTokenKind::Id]);
    }

    #[test]
    fn spans_carry_the_line_offset() {
        let tokens = scan_line("jr $31", 100).expect("line lexes");
        assert_eq!(tokens[0].span, 100..102);
        assert_eq!(tokens[1].span, 103..106);
        assert_eq!(tokens[1].lexeme, "$31");
    }

    #[test]
    fn rejects_stray_punctuation() {
        let err = scan_line("add $1, $2, $3 !", 0).unwrap_err();
        assert_eq!(err.code.as_deref(), Some("asm::scan_failure"));
    }
}
