// Hack assembly model: typed instructions and the finished program.

mod instruction;
mod program;

pub use instruction::{Address, Comp, Dest, Instruction, Jump};
pub use program::AsmProgram;

/// Whether `name` is usable as a Hack assembler symbol: letters, digits,
/// `_`, `.`, `$` and `:`, not starting with a digit.
#[must_use]
pub fn is_valid_symbol(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | ':');
    !first.is_ascii_digit() && allowed(first) && chars.all(allowed)
}
