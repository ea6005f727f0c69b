//! The derivation-tree wire format between the parser and generator stages.
//!
//! A tree is printed in pre-order, one node per line. Internal nodes print
//! their head followed by the right-hand-side symbols of the production that
//! expanded them (an empty production prints the head alone); leaves print
//! their terminal kind followed by the lexeme. Reading classifies a line by
//! whether its head names a terminal, so writing then reading a tree is the
//! identity.

use crate::diag::Diag;
use crate::scanner::token::is_terminal;
use smol_str::SmolStr;
use std::fmt;

/// A node of the derivation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseTree {
    /// A terminal leaf carrying its lexeme.
    Leaf {
        /// Terminal kind name (e.g. `ID`).
        kind: SmolStr,
        /// The verbatim lexeme.
        lexeme: SmolStr,
    },
    /// An interior node expanded by a production.
    Node {
        /// The non-terminal at this node.
        head: SmolStr,
        /// The production's right-hand-side symbols.
        rhs: Vec<SmolStr>,
        /// One child per right-hand-side symbol, in order.
        children: Vec<ParseTree>,
    },
}

impl ParseTree {
    /// Creates a leaf node.
    pub fn leaf(kind: impl Into<SmolStr>, lexeme: impl Into<SmolStr>) -> Self {
        ParseTree::Leaf {
            kind: kind.into(),
            lexeme: lexeme.into(),
        }
    }

    /// The grammar symbol at this node.
    pub fn head(&self) -> &str {
        match self {
            ParseTree::Leaf { kind, .. } => kind,
            ParseTree::Node { head, .. } => head,
        }
    }

    /// The lexeme, for leaves.
    pub fn lexeme(&self) -> Option<&str> {
        match self {
            ParseTree::Leaf { lexeme, .. } => Some(lexeme),
            ParseTree::Node { .. } => None,
        }
    }

    /// The children, empty for leaves.
    pub fn children(&self) -> &[ParseTree] {
        match self {
            ParseTree::Leaf { .. } => &[],
            ParseTree::Node { children, .. } => children,
        }
    }

    /// Reads a derivation tree from its pre-order line format.
    pub fn read(text: &str) -> Result<Self, Diag> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let tree = read_node(&mut lines)?;
        if let Some(extra) = lines.next() {
            return Err(Diag::error(format!(
                "trailing derivation line `{extra}` after complete tree"
            ))
            .with_code("derivation::trailing"));
        }
        Ok(tree)
    }
}

fn read_node<'a>(lines: &mut impl Iterator<Item = &'a str>) -> Result<ParseTree, Diag> {
    let line = lines
        .next()
        .ok_or_else(|| Diag::error("derivation ended early").with_code("derivation::truncated"))?;

    let mut parts = line.split_whitespace();
    let head = parts
        .next()
        .ok_or_else(|| Diag::error("blank derivation line").with_code("derivation::format"))?;

    if is_terminal(head) {
        let lexeme = parts.next().ok_or_else(|| {
            Diag::error(format!("terminal `{head}` is missing its lexeme"))
                .with_code("derivation::format")
        })?;
        return Ok(ParseTree::leaf(head, lexeme));
    }

    let rhs: Vec<SmolStr> = parts.map(SmolStr::new).collect();
    let mut children = Vec::with_capacity(rhs.len());
    for symbol in &rhs {
        let child = read_node(lines)?;
        if child.head() != symbol.as_str() {
            return Err(Diag::error(format!(
                "derivation expands `{symbol}` but the next node is `{}`",
                child.head()
            ))
            .with_code("derivation::mismatch"));
        }
        children.push(child);
    }

    Ok(ParseTree::Node {
        head: SmolStr::new(head),
        rhs,
        children,
    })
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseTree::Leaf { kind, lexeme } => writeln!(f, "{kind} {lexeme}"),
            ParseTree::Node {
                head,
                rhs,
                children,
            } => {
                write!(f, "{head}")?;
                for symbol in rhs {
                    write!(f, " {symbol}")?;
                }
                writeln!(f)?;
                for child in children {
                    write!(f, "{child}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "\
expr expr PLUS term
expr term
term factor
factor ID
ID x
PLUS +
term factor
factor NUM
NUM 3
";

    #[test]
    fn read_builds_nested_tree() {
        let tree = ParseTree::read(SMALL).expect("derivation reads");
        assert_eq!(tree.head(), "expr");
        assert_eq!(tree.children().len(), 3);
        assert_eq!(tree.children()[1].lexeme(), Some("+"));
        assert_eq!(tree.children()[2].head(), "term");
    }

    #[test]
    fn write_read_is_identity() {
        let tree = ParseTree::read(SMALL).expect("derivation reads");
        assert_eq!(tree.to_string(), SMALL);
        assert_eq!(ParseTree::read(&tree.to_string()).unwrap(), tree);
    }

    #[test]
    fn empty_production_line() {
        let tree = ParseTree::read("dcls\n").expect("derivation reads");
        assert_eq!(tree.children().len(), 0);
        assert_eq!(tree.to_string(), "dcls\n");
    }

    #[test]
    fn truncated_derivation() {
        let err = ParseTree::read("expr expr PLUS term\nexpr term\n").unwrap_err();
        assert_eq!(err.code.as_deref(), Some("derivation::truncated"));
    }

    #[test]
    fn mismatched_child() {
        let err = ParseTree::read("expr term\nfactor ID\nID x\n").unwrap_err();
        assert_eq!(err.code.as_deref(), Some("derivation::mismatch"));
    }

    #[test]
    fn leaf_missing_lexeme() {
        let err = ParseTree::read("ID\n").unwrap_err();
        assert_eq!(err.code.as_deref(), Some("derivation::format"));
    }
}
