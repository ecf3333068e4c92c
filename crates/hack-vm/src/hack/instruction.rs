use std::fmt;

/// Operand of an A-instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Constant(u16),
    Symbol(String),
}

/// Destination registers of a C-instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Dest {
    pub a: bool,
    pub d: bool,
    pub m: bool,
}

impl Dest {
    pub const NONE: Dest = Dest::new(false, false, false);
    pub const M: Dest = Dest::new(false, false, true);
    pub const D: Dest = Dest::new(false, true, false);
    pub const MD: Dest = Dest::new(false, true, true);
    pub const A: Dest = Dest::new(true, false, false);
    pub const AM: Dest = Dest::new(true, false, true);
    pub const AD: Dest = Dest::new(true, true, false);
    pub const AMD: Dest = Dest::new(true, true, true);

    #[must_use]
    pub const fn new(a: bool, d: bool, m: bool) -> Self {
        Self { a, d, m }
    }

    /// The `d1 d2 d3` field.
    #[must_use]
    pub const fn bits(self) -> u16 {
        ((self.a as u16) << 2) | ((self.d as u16) << 1) | (self.m as u16)
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        !self.a && !self.d && !self.m
    }
}

/// ALU computation of a C-instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comp {
    Zero,
    One,
    MinusOne,
    D,
    A,
    NotD,
    NotA,
    NegD,
    NegA,
    DPlusOne,
    APlusOne,
    DMinusOne,
    AMinusOne,
    DPlusA,
    DMinusA,
    AMinusD,
    DAndA,
    DOrA,
    M,
    NotM,
    NegM,
    MPlusOne,
    MMinusOne,
    DPlusM,
    DMinusM,
    MMinusD,
    DAndM,
    DOrM,
}

impl Comp {
    pub const ALL: [Comp; 28] = [
        Comp::Zero,
        Comp::One,
        Comp::MinusOne,
        Comp::D,
        Comp::A,
        Comp::NotD,
        Comp::NotA,
        Comp::NegD,
        Comp::NegA,
        Comp::DPlusOne,
        Comp::APlusOne,
        Comp::DMinusOne,
        Comp::AMinusOne,
        Comp::DPlusA,
        Comp::DMinusA,
        Comp::AMinusD,
        Comp::DAndA,
        Comp::DOrA,
        Comp::M,
        Comp::NotM,
        Comp::NegM,
        Comp::MPlusOne,
        Comp::MMinusOne,
        Comp::DPlusM,
        Comp::DMinusM,
        Comp::MMinusD,
        Comp::DAndM,
        Comp::DOrM,
    ];

    /// The `a c1..c6` field.
    #[must_use]
    pub const fn bits(self) -> u16 {
        match self {
            Comp::Zero => 0b010_1010,
            Comp::One => 0b011_1111,
            Comp::MinusOne => 0b011_1010,
            Comp::D => 0b000_1100,
            Comp::A => 0b011_0000,
            Comp::NotD => 0b000_1101,
            Comp::NotA => 0b011_0001,
            Comp::NegD => 0b000_1111,
            Comp::NegA => 0b011_0011,
            Comp::DPlusOne => 0b001_1111,
            Comp::APlusOne => 0b011_0111,
            Comp::DMinusOne => 0b000_1110,
            Comp::AMinusOne => 0b011_0010,
            Comp::DPlusA => 0b000_0010,
            Comp::DMinusA => 0b001_0011,
            Comp::AMinusD => 0b000_0111,
            Comp::DAndA => 0b000_0000,
            Comp::DOrA => 0b001_0101,
            Comp::M => 0b111_0000,
            Comp::NotM => 0b111_0001,
            Comp::NegM => 0b111_0011,
            Comp::MPlusOne => 0b111_0111,
            Comp::MMinusOne => 0b111_0010,
            Comp::DPlusM => 0b100_0010,
            Comp::DMinusM => 0b101_0011,
            Comp::MMinusD => 0b100_0111,
            Comp::DAndM => 0b100_0000,
            Comp::DOrM => 0b101_0101,
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Comp::Zero => "0",
            Comp::One => "1",
            Comp::MinusOne => "-1",
            Comp::D => "D",
            Comp::A => "A",
            Comp::NotD => "!D",
            Comp::NotA => "!A",
            Comp::NegD => "-D",
            Comp::NegA => "-A",
            Comp::DPlusOne => "D+1",
            Comp::APlusOne => "A+1",
            Comp::DMinusOne => "D-1",
            Comp::AMinusOne => "A-1",
            Comp::DPlusA => "D+A",
            Comp::DMinusA => "D-A",
            Comp::AMinusD => "A-D",
            Comp::DAndA => "D&A",
            Comp::DOrA => "D|A",
            Comp::M => "M",
            Comp::NotM => "!M",
            Comp::NegM => "-M",
            Comp::MPlusOne => "M+1",
            Comp::MMinusOne => "M-1",
            Comp::DPlusM => "D+M",
            Comp::DMinusM => "D-M",
            Comp::MMinusD => "M-D",
            Comp::DAndM => "D&M",
            Comp::DOrM => "D|M",
        }
    }

    /// Whether the computation reads the addressed memory cell.
    #[must_use]
    pub const fn reads_memory(self) -> bool {
        self.bits() & 0b100_0000 != 0
    }
}

/// Jump condition of a C-instruction, tested against the ALU output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Jump {
    #[default]
    Never,
    Gt,
    Eq,
    Ge,
    Lt,
    Ne,
    Le,
    Always,
}

impl Jump {
    /// The `j1 j2 j3` field.
    #[must_use]
    pub const fn bits(self) -> u16 {
        match self {
            Jump::Never => 0,
            Jump::Gt => 1,
            Jump::Eq => 2,
            Jump::Ge => 3,
            Jump::Lt => 4,
            Jump::Ne => 5,
            Jump::Le => 6,
            Jump::Always => 7,
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Jump::Never => "",
            Jump::Gt => "JGT",
            Jump::Eq => "JEQ",
            Jump::Ge => "JGE",
            Jump::Lt => "JLT",
            Jump::Ne => "JNE",
            Jump::Le => "JLE",
            Jump::Always => "JMP",
        }
    }
}

/// One line of Hack assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `@value` or `@symbol`: loads A.
    At(Address),
    /// `dest=comp;jump`.
    Compute { dest: Dest, comp: Comp, jump: Jump },
    /// `(NAME)`: a location marker; occupies no ROM word.
    Label(String),
}

impl Instruction {
    #[must_use]
    pub fn at_const(value: u16) -> Self {
        Instruction::At(Address::Constant(value))
    }

    #[must_use]
    pub fn at(symbol: impl Into<String>) -> Self {
        Instruction::At(Address::Symbol(symbol.into()))
    }

    /// `dest=comp` with no jump.
    #[must_use]
    pub const fn assign(dest: Dest, comp: Comp) -> Self {
        Instruction::Compute {
            dest,
            comp,
            jump: Jump::Never,
        }
    }

    /// `comp;jump` with no destination.
    #[must_use]
    pub const fn branch(comp: Comp, jump: Jump) -> Self {
        Instruction::Compute {
            dest: Dest::NONE,
            comp,
            jump,
        }
    }

    #[must_use]
    pub fn label(name: impl Into<String>) -> Self {
        Instruction::Label(name.into())
    }

    /// Whether this line assembles to a ROM word.
    #[must_use]
    pub const fn occupies_rom(&self) -> bool {
        !matches!(self, Instruction::Label(_))
    }
}

impl fmt::Display for Dest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a {
            f.write_str("A")?;
        }
        if self.m {
            f.write_str("M")?;
        }
        if self.d {
            f.write_str("D")?;
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Constant(value) => write!(f, "{value}"),
            Address::Symbol(symbol) => f.write_str(symbol),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::At(address) => write!(f, "@{address}"),
            Instruction::Compute { dest, comp, jump } => {
                if !dest.is_none() {
                    write!(f, "{dest}=")?;
                }
                f.write_str(comp.mnemonic())?;
                if *jump != Jump::Never {
                    write!(f, ";{}", jump.mnemonic())?;
                }
                Ok(())
            }
            Instruction::Label(name) => write!(f, "({name})"),
        }
    }
}
