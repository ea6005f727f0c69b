//! Grammar and LR(1) action-table loading.
//!
//! The table file format is sectioned by counts: terminals, non-terminals,
//! the start symbol, productions, the state count, and finally the action
//! rows `<state> <symbol> <shift|reduce> <argument>`. The driver in the
//! parent module is agnostic to the grammar the tables describe.

use crate::diag::Diag;
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};

/// A single production rule: `head -> rhs...` (rhs may be empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    /// The non-terminal on the left-hand side.
    pub head: SmolStr,
    /// The right-hand-side symbols in order.
    pub rhs: Vec<SmolStr>,
}

/// A grammar together with its LR(1) action tables.
#[derive(Debug, Clone)]
pub struct ParseTables {
    terminals: HashSet<SmolStr>,
    nonterminals: HashSet<SmolStr>,
    start: SmolStr,
    productions: Vec<Production>,
    state_count: usize,
    shifts: HashMap<usize, HashMap<SmolStr, usize>>,
    reduces: HashMap<usize, HashMap<SmolStr, usize>>,
}

impl ParseTables {
    /// Parses the sectioned table format.
    pub fn parse(text: &str) -> Result<Self, Diag> {
        let mut lines = text.lines();

        let terminal_count = read_count(&mut lines, "terminal count")?;
        let terminals = read_symbols(&mut lines, terminal_count, "terminal")?;

        let nonterminal_count = read_count(&mut lines, "non-terminal count")?;
        let nonterminals = read_symbols(&mut lines, nonterminal_count, "non-terminal")?;

        let start = SmolStr::new(read_line(&mut lines, "start symbol")?.trim());

        let production_count = read_count(&mut lines, "production count")?;
        let mut productions = Vec::with_capacity(production_count);
        for _ in 0..production_count {
            let line = read_line(&mut lines, "production")?;
            let mut symbols = line.split_whitespace().map(SmolStr::new);
            let head = symbols
                .next()
                .ok_or_else(|| Diag::error("empty production rule").with_code("grammar::format"))?;
            productions.push(Production {
                head,
                rhs: symbols.collect(),
            });
        }

        let state_count = read_count(&mut lines, "state count")?;
        let action_count = read_count(&mut lines, "action count")?;

        let mut shifts: HashMap<usize, HashMap<SmolStr, usize>> = HashMap::new();
        let mut reduces: HashMap<usize, HashMap<SmolStr, usize>> = HashMap::new();

        for _ in 0..action_count {
            let line = read_line(&mut lines, "action row")?;
            let mut parts = line.split_whitespace();
            let (Some(state), Some(symbol), Some(action), Some(argument)) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return Err(Diag::error(format!("malformed action row `{line}`"))
                    .with_code("grammar::format"));
            };

            let state: usize = state.parse().map_err(|_| {
                Diag::error(format!("invalid state number `{state}`")).with_code("grammar::format")
            })?;
            let argument: usize = argument.parse().map_err(|_| {
                Diag::error(format!("invalid action argument `{argument}`"))
                    .with_code("grammar::format")
            })?;

            let table = match action {
                "shift" => &mut shifts,
                "reduce" => &mut reduces,
                other => {
                    return Err(Diag::error(format!("unknown action `{other}`"))
                        .with_code("grammar::format"));
                }
            };
            table
                .entry(state)
                .or_default()
                .insert(SmolStr::new(symbol), argument);
        }

        Ok(Self {
            terminals,
            nonterminals,
            start,
            productions,
            state_count,
            shifts,
            reduces,
        })
    }

    /// The grammar's start symbol.
    pub fn start(&self) -> &str {
        &self.start
    }

    /// The number of parser states.
    pub fn state_count(&self) -> usize {
        self.state_count
    }

    /// The production with the given rule number.
    pub fn production(&self, rule: usize) -> Option<&Production> {
        self.productions.get(rule)
    }

    /// Looks up the shift (or goto) target for `symbol` in `state`.
    pub fn shift(&self, state: usize, symbol: &str) -> Option<usize> {
        self.shifts.get(&state)?.get(symbol).copied()
    }

    /// Looks up the reduction rule for lookahead `symbol` in `state`.
    pub fn reduce(&self, state: usize, symbol: &str) -> Option<usize> {
        self.reduces.get(&state)?.get(symbol).copied()
    }

    /// Returns true if `symbol` is a terminal of this grammar.
    pub fn is_terminal(&self, symbol: &str) -> bool {
        self.terminals.contains(symbol)
    }

    /// Returns true if `symbol` is a non-terminal of this grammar.
    pub fn is_nonterminal(&self, symbol: &str) -> bool {
        self.nonterminals.contains(symbol)
    }
}

fn read_line<'a>(lines: &mut std::str::Lines<'a>, what: &str) -> Result<&'a str, Diag> {
    lines.next().ok_or_else(|| {
        Diag::error(format!("unexpected end of table file, expected {what}"))
            .with_code("grammar::format")
    })
}

fn read_count(lines: &mut std::str::Lines<'_>, what: &str) -> Result<usize, Diag> {
    let line = read_line(lines, what)?;
    line.trim().parse().map_err(|_| {
        Diag::error(format!("invalid {what} `{line}`")).with_code("grammar::format")
    })
}

fn read_symbols(
    lines: &mut std::str::Lines<'_>,
    count: usize,
    what: &str,
) -> Result<HashSet<SmolStr>, Diag> {
    let mut symbols = HashSet::with_capacity(count);
    for _ in 0..count {
        symbols.insert(SmolStr::new(read_line(lines, what)?.trim()));
    }
    Ok(symbols)
}
