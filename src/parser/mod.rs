//! Table-driven LR(1) parsing.
//!
//! The driver is grammar-agnostic: it consumes `(kind, lexeme)` pairs plus a
//! [`ParseTables`] instance and produces a derivation tree. Reductions are
//! applied greedily against the current lookahead before each shift; the
//! first missing shift action is a syntax error and aborts the parse.

pub mod derivation;
pub mod grammar;

pub use derivation::ParseTree;
pub use grammar::{ParseTables, Production};

use crate::diag::Diag;
use smol_str::SmolStr;

/// Marker wrapped around the token stream before parsing begins.
pub const BOF: &str = "BOF";
/// Marker appended to the token stream before parsing begins.
pub const EOF: &str = "EOF";

/// An LR(1) parser over a fixed set of tables.
pub struct Parser<'t> {
    tables: &'t ParseTables,
}

impl<'t> Parser<'t> {
    /// Creates a parser over the given tables.
    pub fn new(tables: &'t ParseTables) -> Self {
        Self { tables }
    }

    /// Parses a stream of `(kind, lexeme)` pairs into a derivation tree.
    ///
    /// The stream is wrapped in `BOF`/`EOF` markers internally; error
    /// positions count the synthetic `BOF` as token 0.
    pub fn parse(&self, tokens: &[(SmolStr, SmolStr)]) -> Result<ParseTree, Diag> {
        let mut stream: Vec<(SmolStr, SmolStr)> = Vec::with_capacity(tokens.len() + 2);
        stream.push((SmolStr::new(BOF), SmolStr::new(BOF)));
        stream.extend_from_slice(tokens);
        stream.push((SmolStr::new(EOF), SmolStr::new(EOF)));

        let mut symbols: Vec<ParseTree> = Vec::new();
        let mut states: Vec<usize> = Vec::new();

        let (kind, lexeme) = &stream[0];
        symbols.push(ParseTree::leaf(kind.clone(), lexeme.clone()));
        states.push(self.shift_from(0, kind, 0)?);

        for (index, (kind, lexeme)) in stream.iter().enumerate().skip(1) {
            // Reduce greedily while the lookahead admits a reduction.
            while let Some(rule) = self.tables.reduce(top(&states), kind) {
                let production = self.tables.production(rule).ok_or_else(|| {
                    Diag::error(format!("action table names unknown rule {rule}"))
                        .with_code("parse::bad_tables")
                })?;

                let arity = production.rhs.len();
                let children = symbols.split_off(symbols.len() - arity);
                states.truncate(states.len() - arity);

                states.push(self.shift_from(top(&states), &production.head, index)?);
                symbols.push(ParseTree::Node {
                    head: production.head.clone(),
                    rhs: production.rhs.clone(),
                    children,
                });
            }

            symbols.push(ParseTree::leaf(kind.clone(), lexeme.clone()));
            states.push(self.shift_from(top(&states), kind, index)?);
        }

        // EOF has been shifted, so the stack spells out the start production.
        let rhs: Vec<SmolStr> = symbols
            .iter()
            .map(|node| SmolStr::new(node.head()))
            .collect();
        Ok(ParseTree::Node {
            head: SmolStr::new(self.tables.start()),
            rhs,
            children: symbols,
        })
    }

    fn shift_from(&self, state: usize, symbol: &str, index: usize) -> Result<usize, Diag> {
        self.tables.shift(state, symbol).ok_or_else(|| {
            Diag::error(format!(
                "at token {index}: no action for `{symbol}` in state {state}"
            ))
            .with_code("parse::syntax")
            .with_note(format!("token index {index} counts BOF as token 0"))
        })
    }
}

fn top(states: &[usize]) -> usize {
    *states.last().expect("state stack is never empty mid-parse")
}
