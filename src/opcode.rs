use std::{error::Error, fmt, str::FromStr};

/// Largest value a single memory cell or address field can hold.
pub const MAX_VALUE: u16 = 999;

/// Instructions understood by the Johnny machine.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Opcode {
    /// Load a memory cell into the accumulator
    Take,
    Add,
    Sub,
    /// Store the accumulator into a memory cell
    Save,
    /// Unconditional jump
    Jmp,
    /// Skip the next instruction if the memory cell is zero
    Tst,
    Inc,
    Dec,
    /// Set a memory cell to zero
    Null,
    Hlt,
}

impl Opcode {
    pub const ALL: [Opcode; 10] = [
        Opcode::Take,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Save,
        Opcode::Jmp,
        Opcode::Tst,
        Opcode::Inc,
        Opcode::Dec,
        Opcode::Null,
        Opcode::Hlt,
    ];

    /// Numeric code placed in front of the address field.
    pub fn digit(self) -> u8 {
        match self {
            Opcode::Take => 1,
            Opcode::Add => 2,
            Opcode::Sub => 3,
            Opcode::Save => 4,
            Opcode::Jmp => 5,
            Opcode::Tst => 6,
            Opcode::Inc => 7,
            Opcode::Dec => 8,
            Opcode::Null => 9,
            Opcode::Hlt => 10,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Take => "TAKE",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Save => "SAVE",
            Opcode::Jmp => "JMP",
            Opcode::Tst => "TST",
            Opcode::Inc => "INC",
            Opcode::Dec => "DEC",
            Opcode::Null => "NULL",
            Opcode::Hlt => "HLT",
        }
    }
}

impl FromStr for Opcode {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMnemonic(s.to_string()))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Mnemonic that does not name any instruction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UnknownMnemonic(pub String);

impl Error for UnknownMnemonic {}

impl fmt::Display for UnknownMnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown mnemonic `{}`", self.0)
    }
}

/// Single cell of Johnny memory.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Word {
    /// Plain value, written as three digits
    Data(u16),
    /// Opcode digit followed by a three digit address
    Instr { op: Opcode, addr: u16 },
}

impl Word {
    /// Unused memory.
    pub const EMPTY: Word = Word::Data(0);

    pub fn data(value: u16) -> Self {
        debug_assert!(value <= MAX_VALUE);
        Word::Data(value)
    }

    pub fn instr(op: Opcode, addr: u16) -> Self {
        debug_assert!(addr <= MAX_VALUE);
        Word::Instr { op, addr }
    }

    pub fn is_empty(&self) -> bool {
        *self == Word::EMPTY
    }
}

impl Default for Word {
    fn default() -> Self {
        Word::EMPTY
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Data(value) => write!(f, "{value:03}"),
            Word::Instr { op, addr } => write!(f, "{}{addr:03}", op.digit()),
        }
    }
}
