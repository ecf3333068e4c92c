use std::str::FromStr;

/// A stack arithmetic or logical operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    pub const ALL: [ArithmeticOp; 9] = [
        ArithmeticOp::Add,
        ArithmeticOp::Sub,
        ArithmeticOp::Neg,
        ArithmeticOp::Eq,
        ArithmeticOp::Gt,
        ArithmeticOp::Lt,
        ArithmeticOp::And,
        ArithmeticOp::Or,
        ArithmeticOp::Not,
    ];

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Neg => "neg",
            ArithmeticOp::Eq => "eq",
            ArithmeticOp::Gt => "gt",
            ArithmeticOp::Lt => "lt",
            ArithmeticOp::And => "and",
            ArithmeticOp::Or => "or",
            ArithmeticOp::Not => "not",
        }
    }

    #[must_use]
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.mnemonic() == s)
    }
}

/// A named VM memory segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Constant,
    Local,
    Argument,
    This,
    That,
    Temp,
    Pointer,
    Static,
}

impl Segment {
    pub const ALL: [Segment; 8] = [
        Segment::Constant,
        Segment::Local,
        Segment::Argument,
        Segment::This,
        Segment::That,
        Segment::Temp,
        Segment::Pointer,
        Segment::Static,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Local => "local",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Temp => "temp",
            Segment::Pointer => "pointer",
            Segment::Static => "static",
        }
    }

    /// Segments addressed through a base pointer cell at run time.
    #[must_use]
    pub const fn is_indirect(self) -> bool {
        matches!(
            self,
            Segment::Local | Segment::Argument | Segment::This | Segment::That
        )
    }
}

/// Returned by `Segment::from_str` for names outside the fixed eight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSegmentName(pub String);

impl FromStr for Segment {
    type Err = UnknownSegmentName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|seg| seg.name() == s)
            .ok_or_else(|| UnknownSegmentName(s.to_string()))
    }
}

/// One VM command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Arithmetic(ArithmeticOp),
    Push(Segment, u16),
    Pop(Segment, u16),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function { name: String, n_locals: u16 },
    Call { name: String, n_args: u16 },
    Return,
}

/// A command together with the source line it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCommand {
    pub line: usize,
    pub command: Command,
}
