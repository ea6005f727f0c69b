//! Common test utilities.
//!
//! The centerpiece is a small reference CPU for the target instruction set,
//! plus a test-only assembly runtime so generated programs can be linked and
//! executed: `init` and `delete` are no-ops, `new` is a bump allocator off
//! the end of the loaded image, and `print` stores its argument to the
//! console word at `0xffff000c`, which the CPU captures as output.

#![allow(dead_code)]

use wlp4c::{ParseTree, assemble, translate};

/// Initial `$31`; reaching it as the program counter halts the machine.
pub const RETURN_ADDRESS: u32 = 0x8123_456C;

/// Stores to this address are console output.
pub const CONSOLE: u32 = 0xFFFF_000C;

/// Default machine memory in words (code + heap + stack).
pub const MEMORY_WORDS: usize = 8192;

const STEP_LIMIT: u64 = 10_000_000;

/// Test runtime linked after generated assembly.
pub const RUNTIME: &str = "\
init:
jr $31
print:
lis $5
.word 0xffff000c
sw $1, 0($5)
jr $31
new:
lis $5
.word heapnext
lw $3, 0($5)
lis $6
.word 4
mult $1, $6
mflo $6
add $6, $3, $6
sw $6, 0($5)
jr $31
delete:
jr $31
heapnext:
.word heapend
heapend:
";

/// A minimal interpreter for the assembled instruction set.
pub struct Machine {
    /// General-purpose registers; `$0` is kept at zero.
    pub regs: [u32; 32],
    /// Word-addressed memory.
    pub mem: Vec<u32>,
    /// The program counter.
    pub pc: u32,
    /// The hi register of mult/div.
    pub hi: u32,
    /// The lo register of mult/div.
    pub lo: u32,
    /// Words stored to the console address.
    pub output: Vec<u32>,
}

impl Machine {
    /// Loads a big-endian image at address 0.
    pub fn load(image: &[u8], mem_words: usize) -> Self {
        assert_eq!(image.len() % 4, 0, "image must be whole words");
        assert!(image.len() / 4 <= mem_words, "image exceeds memory");

        let mut mem = vec![0u32; mem_words];
        for (index, chunk) in image.chunks_exact(4).enumerate() {
            mem[index] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        let mut regs = [0u32; 32];
        regs[30] = (mem_words * 4) as u32;
        regs[31] = RETURN_ADDRESS;

        Self {
            regs,
            mem,
            pc: 0,
            hi: 0,
            lo: 0,
            output: Vec::new(),
        }
    }

    /// Runs until the program counter reaches the return sentinel.
    pub fn run(&mut self) {
        let mut steps = 0u64;
        while self.pc != RETURN_ADDRESS {
            self.step();
            steps += 1;
            assert!(steps < STEP_LIMIT, "machine did not terminate");
        }
    }

    fn fetch(&self, address: u32) -> u32 {
        self.mem[(address / 4) as usize]
    }

    fn step(&mut self) {
        let word = self.fetch(self.pc);
        self.pc = self.pc.wrapping_add(4);

        let opcode = word >> 26;
        let rs = ((word >> 21) & 31) as usize;
        let rt = ((word >> 16) & 31) as usize;
        let rd = ((word >> 11) & 31) as usize;
        let imm = (word & 0xFFFF) as u16 as i16;

        match opcode {
            0 => match word & 0x3F {
                0x20 => self.regs[rd] = self.regs[rs].wrapping_add(self.regs[rt]),
                0x22 => self.regs[rd] = self.regs[rs].wrapping_sub(self.regs[rt]),
                0x18 => {
                    let product =
                        i64::from(self.regs[rs] as i32) * i64::from(self.regs[rt] as i32);
                    self.hi = (product >> 32) as u32;
                    self.lo = product as u32;
                }
                0x19 => {
                    let product = u64::from(self.regs[rs]) * u64::from(self.regs[rt]);
                    self.hi = (product >> 32) as u32;
                    self.lo = product as u32;
                }
                0x1A => {
                    let (lhs, rhs) = (self.regs[rs] as i32, self.regs[rt] as i32);
                    self.lo = (lhs / rhs) as u32;
                    self.hi = (lhs % rhs) as u32;
                }
                0x1B => {
                    let (lhs, rhs) = (self.regs[rs], self.regs[rt]);
                    self.lo = lhs / rhs;
                    self.hi = lhs % rhs;
                }
                0x10 => self.regs[rd] = self.hi,
                0x12 => self.regs[rd] = self.lo,
                0x14 => {
                    self.regs[rd] = self.fetch(self.pc);
                    self.pc = self.pc.wrapping_add(4);
                }
                0x2A => self.regs[rd] = u32::from((self.regs[rs] as i32) < (self.regs[rt] as i32)),
                0x2B => self.regs[rd] = u32::from(self.regs[rs] < self.regs[rt]),
                0x08 => self.pc = self.regs[rs],
                0x09 => {
                    let target = self.regs[rs];
                    self.regs[31] = self.pc;
                    self.pc = target;
                }
                other => panic!("unknown function code {other:#x}"),
            },
            0x04 => {
                if self.regs[rs] == self.regs[rt] {
                    self.pc = self.pc.wrapping_add((i32::from(imm) * 4) as u32);
                }
            }
            0x05 => {
                if self.regs[rs] != self.regs[rt] {
                    self.pc = self.pc.wrapping_add((i32::from(imm) * 4) as u32);
                }
            }
            0x23 => {
                let address = self.regs[rs].wrapping_add(i32::from(imm) as u32);
                self.regs[rt] = self.fetch(address);
            }
            0x2B => {
                let address = self.regs[rs].wrapping_add(i32::from(imm) as u32);
                if address == CONSOLE {
                    self.output.push(self.regs[rt]);
                } else {
                    self.mem[(address / 4) as usize] = self.regs[rt];
                }
            }
            other => panic!("unknown opcode {other:#x}"),
        }

        self.regs[0] = 0;
    }
}

/// Links generated assembly with the test runtime, assembles, and runs with
/// the given entry arguments.
pub fn link_and_run(assembly: &str, arg1: u32, arg2: u32) -> Machine {
    let linked = format!("{assembly}{RUNTIME}");
    let image = assemble(&linked).expect("linked program assembles");
    let mut machine = Machine::load(&image, MEMORY_WORDS);
    machine.regs[1] = arg1;
    machine.regs[2] = arg2;
    machine.run();
    machine
}

/// Runs the generator stage over derivation text.
pub fn compile_derivation(derivation: &str) -> String {
    let tree = ParseTree::read(derivation).expect("derivation reads");
    translate(&tree).expect("program compiles")
}

/// Compiles derivation text, links the runtime, and executes.
pub fn run_derivation(derivation: &str, arg1: u32, arg2: u32) -> Machine {
    link_and_run(&compile_derivation(derivation), arg1, arg2)
}
