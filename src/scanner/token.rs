//! Token kinds and representations for WLP4 lexical analysis.

use crate::diag::Span;
use logos::Logos;
use smol_str::SmolStr;
use std::fmt;

/// The kind of a lexical token in WLP4.
///
/// The pattern set covers one comment-stripped source line; the scanner
/// feeds lines in one at a time, so newlines and `//` comments never reach
/// the lexer. Keyword literals outrank the identifier pattern at equal
/// match length, so `int` is [`TokenKind::Int`] while `interior` stays an
/// identifier.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r]+")]
pub enum TokenKind {
    // Keywords
    #[token("int")]
    Int,
    #[token("wain")]
    Wain,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("println")]
    Println,
    #[token("return")]
    Return,
    #[token("new")]
    New,
    #[token("delete")]
    Delete,
    #[token("NULL")]
    Null,

    // Identifiers and literals
    #[regex("[a-zA-Z][a-zA-Z0-9]*")]
    Id,
    // A number is 0 or starts with a nonzero digit; `0123` therefore lexes
    // as two adjacent numbers and is rejected by the juxtaposition rule.
    #[regex("0|[1-9][0-9]*")]
    Num,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBrack,
    #[token("]")]
    RBrack,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,

    // Comparison operators and assignment
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Becomes,

    // Arithmetic and pointer operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Pct,
    #[token("&")]
    Amp,
}

impl TokenKind {
    /// The terminal name used on the wire between pipeline stages.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Int => "INT",
            TokenKind::Wain => "WAIN",
            TokenKind::If => "IF",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::Println => "PRINTLN",
            TokenKind::Return => "RETURN",
            TokenKind::New => "NEW",
            TokenKind::Delete => "DELETE",
            TokenKind::Null => "NULL",
            TokenKind::Id => "ID",
            TokenKind::Num => "NUM",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::LBrack => "LBRACK",
            TokenKind::RBrack => "RBRACK",
            TokenKind::Comma => "COMMA",
            TokenKind::Semi => "SEMI",
            TokenKind::Eq => "EQ",
            TokenKind::Ne => "NE",
            TokenKind::Le => "LE",
            TokenKind::Ge => "GE",
            TokenKind::Lt => "LT",
            TokenKind::Gt => "GT",
            TokenKind::Becomes => "BECOMES",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Star => "STAR",
            TokenKind::Slash => "SLASH",
            TokenKind::Pct => "PCT",
            TokenKind::Amp => "AMP",
        }
    }

    /// Wordlike tokens must be separated from each other by whitespace.
    pub fn is_wordlike(self) -> bool {
        matches!(
            self,
            TokenKind::Id
                | TokenKind::Num
                | TokenKind::Int
                | TokenKind::Wain
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::While
                | TokenKind::Println
                | TokenKind::Return
                | TokenKind::New
                | TokenKind::Delete
                | TokenKind::Null
        )
    }

    /// Comparison-class tokens must be separated from each other by
    /// whitespace (`===` would otherwise be ambiguous).
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::Ne
                | TokenKind::Le
                | TokenKind::Ge
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::Becomes
        )
    }
}

/// Returns true if `symbol` names a terminal of the source grammar.
///
/// `BOF` and `EOF` are synthesized by the parser stage rather than the
/// scanner but count as terminals in derivation output.
pub fn is_terminal(symbol: &str) -> bool {
    matches!(
        symbol,
        "BOF"
            | "EOF"
            | "ID"
            | "NUM"
            | "INT"
            | "WAIN"
            | "IF"
            | "ELSE"
            | "WHILE"
            | "PRINTLN"
            | "RETURN"
            | "NEW"
            | "DELETE"
            | "NULL"
            | "LPAREN"
            | "RPAREN"
            | "LBRACE"
            | "RBRACE"
            | "LBRACK"
            | "RBRACK"
            | "COMMA"
            | "SEMI"
            | "EQ"
            | "NE"
            | "LE"
            | "GE"
            | "LT"
            | "GT"
            | "BECOMES"
            | "PLUS"
            | "MINUS"
            | "STAR"
            | "SLASH"
            | "PCT"
            | "AMP"
    )
}

/// A scanned token: kind, verbatim lexeme, and byte span into the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// The verbatim source text of the token.
    pub lexeme: SmolStr,
    /// Byte range of the lexeme in the source.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, lexeme: impl Into<SmolStr>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.name(), self.lexeme)
    }
}
