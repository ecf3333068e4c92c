// Instruction buffer shared by all generators.
//
// Every generator appends through `AsmEmitter`; nothing reads the buffer
// back until `into_program`. Fresh internal labels come from a single
// counter so they are unique across the whole translation.

use crate::hack::{AsmProgram, Comp, Dest, Instruction, Jump};

#[derive(Debug, Default)]
pub struct AsmEmitter {
    instructions: Vec<Instruction>,
    /// Next suffix for `fresh_label`.
    next_label: usize,
}

impl AsmEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    /// Allocate a globally unique internal label `__{kind}.{n}`.
    pub fn fresh_label(&mut self, kind: &str) -> String {
        let id = self.next_label;
        self.next_label += 1;
        format!("__{kind}.{id}")
    }

    pub fn define_label(&mut self, name: &str) {
        self.emit(Instruction::label(name));
    }

    /// Number of ROM words emitted so far.
    pub fn rom_size(&self) -> usize {
        self.instructions
            .iter()
            .filter(|instr| instr.occupies_rom())
            .count()
    }

    pub fn into_program(self) -> AsmProgram {
        AsmProgram::new(self.instructions)
    }

    // ── Single instructions ──

    pub fn at(&mut self, symbol: &str) {
        self.emit(Instruction::at(symbol));
    }

    pub fn at_const(&mut self, value: u16) {
        self.emit(Instruction::at_const(value));
    }

    pub fn assign(&mut self, dest: Dest, comp: Comp) {
        self.emit(Instruction::assign(dest, comp));
    }

    pub fn branch(&mut self, comp: Comp, jump: Jump) {
        self.emit(Instruction::branch(comp, jump));
    }

    // ── Common sequences ──

    /// `D = value`
    pub fn load_constant_d(&mut self, value: u16) {
        self.at_const(value);
        self.assign(Dest::D, Comp::A);
    }

    /// `D = &label`
    pub fn load_address_d(&mut self, label: &str) {
        self.at(label);
        self.assign(Dest::D, Comp::A);
    }

    /// `D = RAM[symbol]`
    pub fn load_d(&mut self, symbol: &str) {
        self.at(symbol);
        self.assign(Dest::D, Comp::M);
    }

    /// `RAM[symbol] = D`
    pub fn store_d(&mut self, symbol: &str) {
        self.at(symbol);
        self.assign(Dest::M, Comp::D);
    }

    /// `RAM[SP++] = D`
    pub fn push_d(&mut self) {
        self.at("SP");
        self.assign(Dest::AM, Comp::MPlusOne);
        self.assign(Dest::A, Comp::AMinusOne);
        self.assign(Dest::M, Comp::D);
    }

    /// `D = RAM[--SP]`
    pub fn pop_d(&mut self) {
        self.at("SP");
        self.assign(Dest::AM, Comp::MMinusOne);
        self.assign(Dest::D, Comp::M);
    }

    /// Point A at the current top of stack without popping.
    pub fn address_top(&mut self) {
        self.at("SP");
        self.assign(Dest::A, Comp::MMinusOne);
    }

    pub fn jump_to(&mut self, label: &str) {
        self.at(label);
        self.branch(Comp::Zero, Jump::Always);
    }

    /// Jump to the address stored in `cell`.
    pub fn jump_indirect(&mut self, cell: &str) {
        self.at(cell);
        self.assign(Dest::A, Comp::M);
        self.branch(Comp::Zero, Jump::Always);
    }
}
