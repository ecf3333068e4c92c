use std::fmt;

use super::{ArithmeticOp, Command, Segment};

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Arithmetic(op) => write!(f, "{op}"),

            // Memory access
            Command::Push(segment, index) => write!(f, "push {segment} {index}"),
            Command::Pop(segment, index) => write!(f, "pop {segment} {index}"),

            // Branching
            Command::Label(name) => write!(f, "label {name}"),
            Command::Goto(name) => write!(f, "goto {name}"),
            Command::IfGoto(name) => write!(f, "if-goto {name}"),

            // Functions
            Command::Function { name, n_locals } => write!(f, "function {name} {n_locals}"),
            Command::Call { name, n_args } => write!(f, "call {name} {n_args}"),
            Command::Return => write!(f, "return"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_source_syntax() {
        assert_eq!(Command::Push(Segment::Local, 3).to_string(), "push local 3");
        assert_eq!(Command::IfGoto("LOOP".into()).to_string(), "if-goto LOOP");
        assert_eq!(
            Command::Function {
                name: "Main.fib".into(),
                n_locals: 2
            }
            .to_string(),
            "function Main.fib 2"
        );
        assert_eq!(Command::Arithmetic(ArithmeticOp::Not).to_string(), "not");
    }
}
