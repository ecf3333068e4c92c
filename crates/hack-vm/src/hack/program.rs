use std::fmt;

use super::Instruction;

/// A finished translation: Hack assembly ready to be written out.
#[derive(Debug, Clone, Default)]
pub struct AsmProgram {
    instructions: Vec<Instruction>,
}

impl AsmProgram {
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of ROM words the program assembles to (labels excluded).
    #[must_use]
    pub fn rom_size(&self) -> usize {
        self.instructions
            .iter()
            .filter(|instr| instr.occupies_rom())
            .count()
    }

    /// Names of every `(LABEL)` in definition order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.instructions.iter().filter_map(|instr| match instr {
            Instruction::Label(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for AsmProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instructions {
            writeln!(f, "{instr}")?;
        }
        Ok(())
    }
}
