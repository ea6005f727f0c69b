//! Two-pass assembly of textual instructions into machine words.
//!
//! Pass 1 tokenizes each line, validates instruction shapes and operand
//! ranges, collects label addresses, and keeps validated instructions in an
//! intermediate form. Pass 2 resolves symbolic operands against the label
//! table and packs each instruction into a 32-bit word, emitted big-endian.
//!
//! `.import` declares a symbol as external: it assembles to nothing, and an
//! unresolved reference to it becomes a zero placeholder for a loader to
//! patch. A local label of the same name takes precedence.

pub mod encoding;
pub mod token;

use crate::diag::{Diag, Span};
use encoding::{InstrFormat, InstrSpec, encode, lookup};
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use token::{AsmToken, AsmTokenKind};

/// A `.word` operand.
#[derive(Debug, Clone)]
enum WordValue {
    Literal(u32),
    Symbol(SmolStr, Span),
}

/// A branch's third operand.
#[derive(Debug, Clone)]
enum BranchTarget {
    Displacement(u16),
    Symbol(SmolStr, Span),
}

/// A validated line that occupies an address.
#[derive(Debug, Clone)]
enum Item {
    Word(WordValue),
    Instr {
        spec: &'static InstrSpec,
        regs: Vec<u8>,
        target: Option<BranchTarget>,
        imm: u16,
    },
}

/// Assembles a program into big-endian machine words.
pub fn assemble(source: &str) -> Result<Vec<u8>, Diag> {
    let mut symbols: HashMap<SmolStr, u32> = HashMap::new();
    let mut imports: HashSet<SmolStr> = HashSet::new();
    let mut items: Vec<(u32, Item)> = Vec::new();
    let mut address: u32 = 0;
    let mut offset = 0usize;

    for line in source.lines() {
        let tokens = token::scan_line(line, offset)?;
        offset += line.len() + 1;

        let mut cursor = Cursor::new(&tokens);
        while let Some((label, span)) = cursor.take_label() {
            if symbols.insert(label.clone(), address).is_some() {
                return Err(Diag::error(format!("duplicate label `{label}`"))
                    .with_label(span, "redefined here")
                    .with_code("asm::duplicate_label"));
            }
        }

        if cursor.at_end() {
            continue;
        }

        if let Some(item) = parse_item(&mut cursor, &mut imports)? {
            items.push((address, item));
            address += 4;
        }
    }

    let mut bytes = Vec::with_capacity(items.len() * 4);
    for (address, item) in &items {
        let word = resolve(item, *address, &symbols, &imports)?;
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    Ok(bytes)
}

/// Validates one instruction or directive; `None` for `.import`, which
/// occupies no address.
fn parse_item(cursor: &mut Cursor<'_>, imports: &mut HashSet<SmolStr>) -> Result<Option<Item>, Diag> {
    let head = cursor.advance().expect("caller checked for content");

    let item = match head.kind {
        AsmTokenKind::Word => {
            let value = cursor.expect_word_value()?;
            Some(Item::Word(value))
        }
        AsmTokenKind::Import => {
            let symbol = cursor.expect_id()?;
            imports.insert(symbol);
            None
        }
        AsmTokenKind::Id => {
            let spec = lookup(&head.lexeme).ok_or_else(|| {
                Diag::error(format!("unknown opcode `{}`", head.lexeme))
                    .with_label(head.span.clone(), "not in the instruction table")
                    .with_code("asm::unknown_opcode")
            })?;
            Some(parse_instruction(cursor, spec)?)
        }
        _ => {
            return Err(Diag::error("expected an instruction, directive, or label")
                .with_label(head.span.clone(), "unexpected token")
                .with_code("asm::malformed"));
        }
    };

    cursor.expect_end()?;
    Ok(item)
}

fn parse_instruction(cursor: &mut Cursor<'_>, spec: &'static InstrSpec) -> Result<Item, Diag> {
    let mut regs = Vec::with_capacity(3);
    let mut target = None;
    let mut imm = 0u16;

    match spec.format {
        InstrFormat::OneRegSource | InstrFormat::OneRegDest => {
            regs.push(cursor.expect_register()?);
        }
        InstrFormat::ThreeReg => {
            // The destination register, then the shared source-pair shape.
            regs.push(cursor.expect_register()?);
            cursor.expect_comma()?;
            parse_register_pair(cursor, &mut regs)?;
        }
        InstrFormat::TwoReg => {
            parse_register_pair(cursor, &mut regs)?;
        }
        InstrFormat::Branch => {
            parse_register_pair(cursor, &mut regs)?;
            cursor.expect_comma()?;
            target = Some(cursor.expect_branch_target()?);
        }
        InstrFormat::StoreLoad => {
            regs.push(cursor.expect_register()?);
            cursor.expect_comma()?;
            imm = cursor.expect_imm16()?;
            cursor.expect_lparen()?;
            regs.push(cursor.expect_register()?);
            cursor.expect_rparen()?;
        }
    }

    Ok(Item::Instr {
        spec,
        regs,
        target,
        imm,
    })
}

/// `reg COMMA reg`, the tail shared by the two- and three-register formats.
fn parse_register_pair(cursor: &mut Cursor<'_>, regs: &mut Vec<u8>) -> Result<(), Diag> {
    regs.push(cursor.expect_register()?);
    cursor.expect_comma()?;
    regs.push(cursor.expect_register()?);
    Ok(())
}

fn resolve(
    item: &Item,
    address: u32,
    symbols: &HashMap<SmolStr, u32>,
    imports: &HashSet<SmolStr>,
) -> Result<u32, Diag> {
    match item {
        Item::Word(WordValue::Literal(value)) => Ok(*value),
        Item::Word(WordValue::Symbol(name, span)) => {
            resolve_symbol(name, span, symbols, imports)
        }
        Item::Instr {
            spec,
            regs,
            target,
            imm,
        } => {
            let imm = match target {
                None => *imm,
                Some(BranchTarget::Displacement(value)) => *value,
                Some(BranchTarget::Symbol(name, span)) => {
                    let target_address = resolve_symbol(name, span, symbols, imports)?;
                    let displacement =
                        (i64::from(target_address) - i64::from(address) - 4) / 4;
                    if i16::try_from(displacement).is_err() {
                        return Err(Diag::error(format!(
                            "branch to `{name}` is out of range ({displacement} words)"
                        ))
                        .with_label(span.clone(), "target is too far away")
                        .with_code("asm::branch_range"));
                    }
                    displacement as u16
                }
            };
            Ok(encode(spec, regs, imm))
        }
    }
}

fn resolve_symbol(
    name: &SmolStr,
    span: &Span,
    symbols: &HashMap<SmolStr, u32>,
    imports: &HashSet<SmolStr>,
) -> Result<u32, Diag> {
    if let Some(address) = symbols.get(name) {
        return Ok(*address);
    }
    // Imported symbols assemble as zero placeholders for the loader.
    if imports.contains(name) {
        return Ok(0);
    }
    Err(Diag::error(format!("undefined symbol `{name}`"))
        .with_label(span.clone(), "never defined or imported")
        .with_code("asm::undefined_symbol"))
}

/// Forward-only view over one line's tokens.
struct Cursor<'a> {
    tokens: &'a [AsmToken],
    index: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [AsmToken]) -> Self {
        Self { tokens, index: 0 }
    }

    fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'a AsmToken> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) -> Option<&'a AsmToken> {
        let token = self.tokens.get(self.index)?;
        self.index += 1;
        Some(token)
    }

    fn end_span(&self) -> Span {
        match self.tokens.last() {
            Some(token) => token.span.end..token.span.end,
            None => 0..0,
        }
    }

    /// Consumes a leading label definition, without its colon.
    fn take_label(&mut self) -> Option<(SmolStr, Span)> {
        let token = self.peek()?;
        if token.kind != AsmTokenKind::Label {
            return None;
        }
        self.index += 1;
        let name = SmolStr::new(&token.lexeme[..token.lexeme.len() - 1]);
        Some((name, token.span.clone()))
    }

    fn unexpected(&self, wanted: &str) -> Diag {
        match self.peek() {
            Some(token) => Diag::error(format!("expected {wanted}, found `{}`", token.lexeme))
                .with_label(token.span.clone(), format!("expected {wanted}"))
                .with_code("asm::malformed"),
            None => Diag::error(format!("expected {wanted} before end of line"))
                .with_label(self.end_span(), "line ends here")
                .with_code("asm::malformed"),
        }
    }

    fn expect_end(&self) -> Result<(), Diag> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of line"))
        }
    }

    fn expect_kind(&mut self, kind: AsmTokenKind, wanted: &str) -> Result<&'a AsmToken, Diag> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.index += 1;
                Ok(token)
            }
            _ => Err(self.unexpected(wanted)),
        }
    }

    fn expect_comma(&mut self) -> Result<(), Diag> {
        self.expect_kind(AsmTokenKind::Comma, "a comma").map(|_| ())
    }

    fn expect_lparen(&mut self) -> Result<(), Diag> {
        self.expect_kind(AsmTokenKind::LParen, "an opening parenthesis")
            .map(|_| ())
    }

    fn expect_rparen(&mut self) -> Result<(), Diag> {
        self.expect_kind(AsmTokenKind::RParen, "a closing parenthesis")
            .map(|_| ())
    }

    fn expect_id(&mut self) -> Result<SmolStr, Diag> {
        self.expect_kind(AsmTokenKind::Id, "a symbol")
            .map(|token| token.lexeme.clone())
    }

    fn expect_register(&mut self) -> Result<u8, Diag> {
        let token = self.expect_kind(AsmTokenKind::Register, "a register")?;
        let digits = &token.lexeme[1..];
        let number: Option<u8> = (digits.len() <= 2)
            .then(|| digits.parse().ok())
            .flatten()
            .filter(|number| *number <= 31);
        number.ok_or_else(|| {
            Diag::error(format!("register `{}` out of range", token.lexeme))
                .with_label(token.span.clone(), "registers are $0 through $31")
                .with_code("asm::register_range")
        })
    }

    /// A 16-bit immediate: decimal within i16, or hex with at most 4 digits.
    fn expect_imm16(&mut self) -> Result<u16, Diag> {
        match self.peek() {
            Some(token) if token.kind == AsmTokenKind::Int => {
                self.index += 1;
                let value: Option<i16> = token.lexeme.parse().ok();
                let value = value.ok_or_else(|| {
                    Diag::error(format!("immediate `{}` out of 16-bit range", token.lexeme))
                        .with_label(token.span.clone(), "must fit in a signed 16-bit word")
                        .with_code("asm::immediate_range")
                })?;
                Ok(value as u16)
            }
            Some(token) if token.kind == AsmTokenKind::HexInt => {
                self.index += 1;
                let digits = &token.lexeme[2..];
                let value = (digits.len() <= 4)
                    .then(|| u16::from_str_radix(digits, 16).ok())
                    .flatten();
                value.ok_or_else(|| {
                    Diag::error(format!("immediate `{}` out of 16-bit range", token.lexeme))
                        .with_label(token.span.clone(), "at most 4 hex digits")
                        .with_code("asm::immediate_range")
                })
            }
            _ => Err(self.unexpected("a 16-bit immediate")),
        }
    }

    /// A `.word` operand: a 32-bit number or a symbol reference.
    fn expect_word_value(&mut self) -> Result<WordValue, Diag> {
        match self.peek() {
            Some(token) if token.kind == AsmTokenKind::Int => {
                self.index += 1;
                let value: Option<i64> = token.lexeme.parse().ok();
                let value = value
                    .filter(|value| {
                        *value >= i64::from(i32::MIN) && *value <= i64::from(u32::MAX)
                    })
                    .ok_or_else(|| {
                        Diag::error(format!("word value `{}` out of range", token.lexeme))
                            .with_label(token.span.clone(), "must fit in 32 bits")
                            .with_code("asm::immediate_range")
                    })?;
                Ok(WordValue::Literal(value as u32))
            }
            Some(token) if token.kind == AsmTokenKind::HexInt => {
                self.index += 1;
                let digits = &token.lexeme[2..];
                let value = (digits.len() <= 8)
                    .then(|| u32::from_str_radix(digits, 16).ok())
                    .flatten();
                let value = value.ok_or_else(|| {
                    Diag::error(format!("word value `{}` out of range", token.lexeme))
                        .with_label(token.span.clone(), "at most 8 hex digits")
                        .with_code("asm::immediate_range")
                })?;
                Ok(WordValue::Literal(value))
            }
            Some(token) if token.kind == AsmTokenKind::Id => {
                self.index += 1;
                Ok(WordValue::Symbol(token.lexeme.clone(), token.span.clone()))
            }
            _ => Err(self.unexpected("a 32-bit value or symbol")),
        }
    }

    /// A branch target: a 16-bit displacement or a label reference.
    fn expect_branch_target(&mut self) -> Result<BranchTarget, Diag> {
        match self.peek() {
            Some(token) if token.kind == AsmTokenKind::Id => {
                self.index += 1;
                Ok(BranchTarget::Symbol(
                    token.lexeme.clone(),
                    token.span.clone(),
                ))
            }
            _ => Ok(BranchTarget::Displacement(self.expect_imm16()?)),
        }
    }
}
