//! Test harness for hack-vm unit and integration tests
//!
//! Generated assembly is checked by running it: [`assemble`] turns an
//! [`AsmProgram`] into Hack machine words and [`Cpu`] executes them with the
//! real instruction decoding (the `zx nx zy ny f no` ALU bits included), so
//! a wrong opcode table shows up as wrong results rather than passing a
//! text comparison.
//!
//! # Example
//!
//! ```rust
//! use hack_vm::test_harness::*;
//!
//! let machine = run_vm("push constant 7\npush constant 8\nadd\n").unwrap();
//! assert_eq!(machine.stack(), vec![15]);
//! ```

#![allow(
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::uninlined_format_args
)]

use std::collections::HashMap;

use crate::abi::{ARG, LCL, PREDEFINED_SYMBOLS, SP, STACK_BASE, STATIC_BASE, THAT, THIS};
use crate::hack::{Address, Instruction};
use crate::{AsmProgram, Error, Result, SourceUnit, TranslateOptions, translate};

/// RAM size of the emulated machine (data memory, screen and keyboard).
pub const RAM_SIZE: usize = 0x8000;

/// Default cycle budget for [`Machine::run`].
pub const DEFAULT_CYCLE_LIMIT: u64 = 5_000_000;

/// Segment bases used by [`run_vm`], matching the course test scripts.
pub const TEST_LCL: u16 = 300;
pub const TEST_ARG: u16 = 400;
pub const TEST_THIS: u16 = 3000;
pub const TEST_THAT: u16 = 3010;

/// Translation options for a single unit with no bootstrap.
pub fn bare_options() -> TranslateOptions {
    TranslateOptions {
        bootstrap: false,
        ..TranslateOptions::default()
    }
}

/// Translate VM text as a single unit named `Test`, without bootstrap.
pub fn translate_vm(source: &str) -> Result<AsmProgram> {
    translate_vm_with(source, &bare_options())
}

pub fn translate_vm_with(source: &str, options: &TranslateOptions) -> Result<AsmProgram> {
    translate(&[SourceUnit::new("Test", source)], options)
}

/// Translate several `(unit name, source)` pairs in order.
pub fn translate_units(units: &[(&str, &str)], options: &TranslateOptions) -> Result<AsmProgram> {
    let units: Vec<SourceUnit> = units
        .iter()
        .map(|(name, source)| SourceUnit::new(*name, *source))
        .collect();
    translate(&units, options)
}

/// Translate and run a bootstrap-less unit with the standard segment bases.
pub fn run_vm(source: &str) -> Result<Machine> {
    run_vm_with(source, &bare_options())
}

pub fn run_vm_with(source: &str, options: &TranslateOptions) -> Result<Machine> {
    let program = translate_vm_with(source, options)?;
    let mut machine = Machine::with_test_segments(&program)?;
    machine.run(DEFAULT_CYCLE_LIMIT)?;
    Ok(machine)
}

/// Translate and run a multi-unit program; the bootstrap sets everything up.
pub fn run_program(units: &[(&str, &str)], options: &TranslateOptions) -> Result<Machine> {
    let program = translate_units(units, options)?;
    let mut machine = Machine::new(&program)?;
    machine.run(DEFAULT_CYCLE_LIMIT)?;
    Ok(machine)
}

/// Assemble to machine words.
///
/// Labels resolve to ROM addresses, predefined symbols to their fixed RAM
/// addresses, and every other symbol becomes a variable allocated from
/// RAM 16 upward in order of first use.
pub fn assemble(program: &AsmProgram) -> Result<Vec<u16>> {
    let mut symbols: HashMap<String, u16> = PREDEFINED_SYMBOLS
        .iter()
        .map(|(name, addr)| ((*name).to_string(), *addr))
        .collect();

    let mut rom_addr: u16 = 0;
    for instr in program.instructions() {
        match instr {
            Instruction::Label(name) => {
                if symbols.insert(name.clone(), rom_addr).is_some() {
                    return Err(Error::Internal(format!("label ({name}) defined twice")));
                }
            }
            _ => rom_addr += 1,
        }
    }

    let mut next_variable = STATIC_BASE;
    let mut words = Vec::with_capacity(rom_addr as usize);
    for instr in program.instructions() {
        match instr {
            Instruction::Label(_) => {}
            Instruction::At(Address::Constant(value)) => {
                if *value > 0x7FFF {
                    return Err(Error::Internal(format!("@{value} does not fit in 15 bits")));
                }
                words.push(*value);
            }
            Instruction::At(Address::Symbol(symbol)) => {
                let addr = *symbols.entry(symbol.clone()).or_insert_with(|| {
                    let addr = next_variable;
                    next_variable += 1;
                    addr
                });
                words.push(addr);
            }
            Instruction::Compute { dest, comp, jump } => {
                let word = (0b111 << 13) | (comp.bits() << 6) | (dest.bits() << 3) | jump.bits();
                words.push(word);
            }
        }
    }
    Ok(words)
}

/// Hack CPU: A, D, PC, ROM and RAM.
pub struct Cpu {
    rom: Vec<u16>,
    pub ram: Vec<u16>,
    pub a: u16,
    pub d: u16,
    pub pc: u16,
    halted: bool,
}

impl Cpu {
    pub fn new(rom: Vec<u16>) -> Self {
        Self {
            rom,
            ram: vec![0; RAM_SIZE],
            a: 0,
            d: 0,
            pc: 0,
            halted: false,
        }
    }

    /// Halted when PC runs past the end of ROM or sits in `(L) @L 0;JMP`.
    pub fn is_halted(&self) -> bool {
        self.halted || self.pc as usize >= self.rom.len()
    }

    fn memory(&self, addr: u16) -> Result<u16> {
        self.ram
            .get(addr as usize)
            .copied()
            .ok_or_else(|| Error::Internal(format!("RAM read out of range at {addr}")))
    }

    pub fn step(&mut self) -> Result<()> {
        let pc = self.pc;
        let Some(&instr) = self.rom.get(pc as usize) else {
            self.halted = true;
            return Ok(());
        };

        if instr & 0x8000 == 0 {
            self.a = instr;
            self.pc = pc + 1;
            return Ok(());
        }

        let reads_m = instr & 0x1000 != 0;
        let y = if reads_m { self.memory(self.a)? } else { self.a };
        let out = alu(self.d, y, (instr >> 6) & 0x3F);

        let dest = (instr >> 3) & 0b111;
        let jump = instr & 0b111;
        let old_a = self.a;

        if dest & 0b001 != 0 {
            let cell = self
                .ram
                .get_mut(old_a as usize)
                .ok_or_else(|| Error::Internal(format!("RAM write out of range at {old_a}")))?;
            *cell = out;
        }
        if dest & 0b010 != 0 {
            self.d = out;
        }
        if dest & 0b100 != 0 {
            self.a = out;
        }

        let value = out as i16;
        let taken = (jump & 0b100 != 0 && value < 0)
            || (jump & 0b010 != 0 && value == 0)
            || (jump & 0b001 != 0 && value > 0);
        if taken {
            if jump == 0b111
                && old_a.wrapping_add(1) == pc
                && self.rom.get(old_a as usize) == Some(&old_a)
            {
                self.halted = true;
            }
            self.pc = old_a;
        } else {
            self.pc = pc + 1;
        }
        Ok(())
    }
}

/// The Hack ALU: `zx nx zy ny f no` in bits 5..0 of `control`.
fn alu(x: u16, y: u16, control: u16) -> u16 {
    let bit = |n: u16| control & (1 << n) != 0;
    let mut x = if bit(5) { 0 } else { x };
    if bit(4) {
        x = !x;
    }
    let mut y = if bit(3) { 0 } else { y };
    if bit(2) {
        y = !y;
    }
    let out = if bit(1) { x.wrapping_add(y) } else { x & y };
    if bit(0) { !out } else { out }
}

/// A CPU loaded with a translated program, plus VM-level accessors.
pub struct Machine {
    pub cpu: Cpu,
    pub cycles: u64,
}

impl Machine {
    pub fn new(program: &AsmProgram) -> Result<Self> {
        Ok(Self {
            cpu: Cpu::new(assemble(program)?),
            cycles: 0,
        })
    }

    /// Preset SP and the segment pointers the way a test script would.
    pub fn with_test_segments(program: &AsmProgram) -> Result<Self> {
        let mut machine = Self::new(program)?;
        machine.set(SP, STACK_BASE);
        machine.set(LCL, TEST_LCL);
        machine.set(ARG, TEST_ARG);
        machine.set(THIS, TEST_THIS);
        machine.set(THAT, TEST_THAT);
        Ok(machine)
    }

    /// Run until halted; fails if `max_cycles` is exceeded first.
    pub fn run(&mut self, max_cycles: u64) -> Result<u64> {
        while !self.cpu.is_halted() {
            if self.cycles >= max_cycles {
                return Err(Error::Internal(format!(
                    "program did not halt within {max_cycles} cycles (pc = {})",
                    self.cpu.pc
                )));
            }
            self.cpu.step()?;
            self.cycles += 1;
        }
        Ok(self.cycles)
    }

    pub fn get(&self, addr: u16) -> u16 {
        self.cpu.ram[addr as usize]
    }

    pub fn set(&mut self, addr: u16, value: u16) {
        self.cpu.ram[addr as usize] = value;
    }

    /// Signed view of a RAM cell.
    pub fn signed(&self, addr: u16) -> i16 {
        self.get(addr) as i16
    }

    /// Stack contents from RAM 256 up to SP, bottom first.
    pub fn stack(&self) -> Vec<i16> {
        let sp = self.get(SP);
        (STACK_BASE..sp).map(|addr| self.signed(addr)).collect()
    }

    pub fn top(&self) -> Option<i16> {
        self.stack().last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hack::{Comp, Dest, Jump};

    #[test]
    fn test_assemble_known_encodings() {
        let program = AsmProgram::new(vec![
            Instruction::at_const(2),
            Instruction::assign(Dest::D, Comp::A),
            Instruction::assign(Dest::M, Comp::DPlusM),
            Instruction::assign(Dest::AM, Comp::MMinusOne),
            Instruction::branch(Comp::Zero, Jump::Always),
        ]);
        assert_eq!(
            assemble(&program).unwrap(),
            vec![
                0b0000_0000_0000_0010,
                0b1110_1100_0001_0000,
                0b1111_0000_1000_1000,
                0b1111_1100_1010_1000,
                0b1110_1010_1000_0111,
            ]
        );
    }

    #[test]
    fn test_variables_allocated_from_16() {
        let program = AsmProgram::new(vec![
            Instruction::at("x"),
            Instruction::at("y"),
            Instruction::at("x"),
            Instruction::at("R13"),
        ]);
        assert_eq!(assemble(&program).unwrap(), vec![16, 17, 16, 13]);
    }

    #[test]
    fn test_every_comp_matches_reference_alu() {
        let (d, a, m) = (17u16, 5u16, 3u16);
        for comp in Comp::ALL {
            let y = if comp.reads_memory() { m } else { a };
            let out = alu(d, y, comp.bits() & 0x3F);
            let expected = match comp.mnemonic() {
                "0" => 0,
                "1" => 1,
                "-1" => u16::MAX,
                "D" => d,
                "A" | "M" => y,
                "!D" => !d,
                "!A" | "!M" => !y,
                "-D" => d.wrapping_neg(),
                "-A" | "-M" => y.wrapping_neg(),
                "D+1" => d + 1,
                "A+1" | "M+1" => y + 1,
                "D-1" => d - 1,
                "A-1" | "M-1" => y - 1,
                "D+A" | "D+M" => d + y,
                "D-A" | "D-M" => d.wrapping_sub(y),
                "A-D" | "M-D" => y.wrapping_sub(d),
                "D&A" | "D&M" => d & y,
                "D|A" | "D|M" => d | y,
                other => panic!("unhandled comp {other}"),
            };
            assert_eq!(out, expected, "comp {}", comp.mnemonic());
        }
    }

    #[test]
    fn test_self_loop_halts() {
        let program = AsmProgram::new(vec![
            Instruction::at_const(1),
            Instruction::label("END"),
            Instruction::at("END"),
            Instruction::branch(Comp::Zero, Jump::Always),
        ]);
        let mut machine = Machine::new(&program).unwrap();
        let cycles = machine.run(100).unwrap();
        assert_eq!(cycles, 3);
    }

    #[test]
    fn test_run_vm_example() {
        let machine = run_vm("push constant 7\npush constant 8\nadd\n").unwrap();
        assert_eq!(machine.stack(), vec![15]);
        assert_eq!(machine.get(SP), 257);
    }
}
