//! The instruction set as a data table, and bit-level word encoding.
//!
//! Each opcode maps to an encoding format and a base word; encoding an
//! instruction is a single dispatch on the format that ORs the operand
//! fields into the base. Registers are recorded in source-text order, so
//! the field positions per format live here and nowhere else.

/// How an instruction's operands pack into its word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrFormat {
    /// One register in the rs field (`jr`, `jalr`).
    OneRegSource,
    /// One register in the rd field (`lis`, `mflo`, `mfhi`).
    OneRegDest,
    /// Two registers rs, rt (`mult`, `multu`, `div`, `divu`).
    TwoReg,
    /// Three registers written rd, rs, rt (`add`, `sub`, `slt`, `sltu`).
    ThreeReg,
    /// Two registers and a 16-bit displacement (`beq`, `bne`).
    Branch,
    /// Register, immediate, base register (`sw`, `lw`).
    StoreLoad,
}

/// One row of the instruction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrSpec {
    /// The opcode mnemonic.
    pub mnemonic: &'static str,
    /// The operand format.
    pub format: InstrFormat,
    /// The word with all operand fields zero.
    pub base: u32,
}

/// The full instruction set, grouped by format.
pub const INSTRUCTIONS: &[InstrSpec] = &[
    InstrSpec { mnemonic: "jr", format: InstrFormat::OneRegSource, base: 0x0000_0008 },
    InstrSpec { mnemonic: "jalr", format: InstrFormat::OneRegSource, base: 0x0000_0009 },
    InstrSpec { mnemonic: "mfhi", format: InstrFormat::OneRegDest, base: 0x0000_0010 },
    InstrSpec { mnemonic: "mflo", format: InstrFormat::OneRegDest, base: 0x0000_0012 },
    InstrSpec { mnemonic: "lis", format: InstrFormat::OneRegDest, base: 0x0000_0014 },
    InstrSpec { mnemonic: "mult", format: InstrFormat::TwoReg, base: 0x0000_0018 },
    InstrSpec { mnemonic: "multu", format: InstrFormat::TwoReg, base: 0x0000_0019 },
    InstrSpec { mnemonic: "div", format: InstrFormat::TwoReg, base: 0x0000_001A },
    InstrSpec { mnemonic: "divu", format: InstrFormat::TwoReg, base: 0x0000_001B },
    InstrSpec { mnemonic: "add", format: InstrFormat::ThreeReg, base: 0x0000_0020 },
    InstrSpec { mnemonic: "sub", format: InstrFormat::ThreeReg, base: 0x0000_0022 },
    InstrSpec { mnemonic: "slt", format: InstrFormat::ThreeReg, base: 0x0000_002A },
    InstrSpec { mnemonic: "sltu", format: InstrFormat::ThreeReg, base: 0x0000_002B },
    InstrSpec { mnemonic: "beq", format: InstrFormat::Branch, base: 0x1000_0000 },
    InstrSpec { mnemonic: "bne", format: InstrFormat::Branch, base: 0x1400_0000 },
    InstrSpec { mnemonic: "lw", format: InstrFormat::StoreLoad, base: 0x8C00_0000 },
    InstrSpec { mnemonic: "sw", format: InstrFormat::StoreLoad, base: 0xAC00_0000 },
];

/// Looks up an opcode in the instruction table.
pub fn lookup(mnemonic: &str) -> Option<&'static InstrSpec> {
    INSTRUCTIONS.iter().find(|spec| spec.mnemonic == mnemonic)
}

/// Packs an instruction word from registers in source-text order plus the
/// 16-bit immediate (zero for formats without one).
pub fn encode(spec: &InstrSpec, regs: &[u8], imm: u16) -> u32 {
    let reg = |index: usize| u32::from(regs[index]);
    match spec.format {
        InstrFormat::OneRegSource => spec.base | reg(0) << 21,
        InstrFormat::OneRegDest => spec.base | reg(0) << 11,
        InstrFormat::TwoReg => spec.base | reg(0) << 21 | reg(1) << 16,
        // Written `op rd, rs, rt`.
        InstrFormat::ThreeReg => spec.base | reg(0) << 11 | reg(1) << 21 | reg(2) << 16,
        InstrFormat::Branch => spec.base | reg(0) << 21 | reg(1) << 16 | u32::from(imm),
        // Written `op rt, imm(rs)`.
        InstrFormat::StoreLoad => spec.base | reg(0) << 16 | reg(1) << 21 | u32::from(imm),
    }
}
