use std::fmt;
use std::str::FromStr;

/// Operation selected by the high nibble of an instruction's first byte.
///
/// All sixteen nibble values are assigned, so decoding can never fail.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x0,
    Hlt = 0x1,
    Add = 0x2,
    Sub = 0x3,
    And = 0x4,
    Or = 0x5,
    Xor = 0x6,
    Nor = 0x7,
    Jmp = 0x8,
    Rsh = 0x9,
    Lsh = 0xA,
    Ldi = 0xB,
    Adi = 0xC,
    Brz = 0xD,
    Plt = 0xE,
    Seg = 0xF,
}

impl Opcode {
    /// Indexed by opcode value.
    pub const ALL: [Opcode; 16] = [
        Opcode::Nop,
        Opcode::Hlt,
        Opcode::Add,
        Opcode::Sub,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Nor,
        Opcode::Jmp,
        Opcode::Rsh,
        Opcode::Lsh,
        Opcode::Ldi,
        Opcode::Adi,
        Opcode::Brz,
        Opcode::Plt,
        Opcode::Seg,
    ];

    /// Upper bits of `nibble` are ignored.
    pub fn from_nibble(nibble: u8) -> Opcode {
        Self::ALL[(nibble & 0xF) as usize]
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Hlt => "HLT",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Nor => "NOR",
            Opcode::Jmp => "JMP",
            Opcode::Rsh => "RSH",
            Opcode::Lsh => "LSH",
            Opcode::Ldi => "LDI",
            Opcode::Adi => "ADI",
            Opcode::Brz => "BRZ",
            Opcode::Plt => "PLT",
            Opcode::Seg => "SEG",
        }
    }

    /// Operand grammar accepted by the assembler for this opcode.
    pub fn shape(self) -> Shape {
        match self {
            Opcode::Nop | Opcode::Hlt => Shape::None,
            Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Or | Opcode::Xor | Opcode::Nor => {
                Shape::Triple
            }
            Opcode::Rsh | Opcode::Lsh => Shape::Shift,
            Opcode::Ldi | Opcode::Adi => Shape::RegImm,
            Opcode::Jmp | Opcode::Brz => Shape::Addr,
            Opcode::Plt => Shape::Plot,
            Opcode::Seg => Shape::Reg,
        }
    }
}

impl FromStr for Opcode {
    type Err = ();

    /// Case-insensitive mnemonic lookup.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Layout of the 12-bit operand field, as written in source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Shape {
    /// No operands.
    None,
    /// `a, b, c`: three registers, one per nibble.
    Triple,
    /// `a, _, c`: three registers, the middle one is not encoded.
    Shift,
    /// `reg, imm`: register in the high nibble, 8-bit value in the low byte.
    RegImm,
    /// `addr`: 8-bit address in the low byte.
    Addr,
    /// `x, y`: registers in the two high nibbles.
    Plot,
    /// `reg`: register in the high nibble.
    Reg,
}

impl Shape {
    /// Amount of comma separated operands expected in source.
    pub fn arity(self) -> usize {
        match self {
            Shape::None => 0,
            Shape::Addr | Shape::Reg => 1,
            Shape::RegImm | Shape::Plot => 2,
            Shape::Triple | Shape::Shift => 3,
        }
    }
}

/// One of the sixteen general purpose registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Register(u8);

impl Register {
    pub const COUNT: usize = 16;
    /// Written by the input collaborator once per frame.
    pub const INPUT: Register = Register(15);

    pub fn new(index: u32) -> Option<Register> {
        if (index as usize) < Self::COUNT {
            Some(Register(index as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A single decoded 16-bit instruction word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Instr {
    opcode: Opcode,
    /// Only the low 12 bits are ever set.
    operand: u16,
}

impl Instr {
    pub fn new(opcode: Opcode, operand: u16) -> Self {
        Instr {
            opcode,
            operand: operand & 0x0FFF,
        }
    }

    pub fn bare(opcode: Opcode) -> Self {
        Self::new(opcode, 0)
    }

    pub fn triple(opcode: Opcode, a: Register, b: Register, c: Register) -> Self {
        Self::new(
            opcode,
            (a.0 as u16) << 8 | (b.0 as u16) << 4 | c.0 as u16,
        )
    }

    pub fn reg_imm(opcode: Opcode, reg: Register, imm: u8) -> Self {
        Self::new(opcode, (reg.0 as u16) << 8 | imm as u16)
    }

    pub fn addr(opcode: Opcode, addr: u8) -> Self {
        Self::new(opcode, addr as u16)
    }

    /// Total over every possible pair of bytes.
    pub fn decode(bytes: [u8; 2]) -> Self {
        let opcode = Opcode::from_nibble(bytes[0] >> 4);
        Self::new(opcode, ((bytes[0] & 0x0F) as u16) << 8 | bytes[1] as u16)
    }

    pub fn encode(self) -> [u8; 2] {
        self.word().to_be_bytes()
    }

    pub fn word(self) -> u16 {
        (self.opcode as u16) << 12 | self.operand
    }

    pub fn opcode(self) -> Opcode {
        self.opcode
    }

    #[inline]
    pub fn a(self) -> usize {
        ((self.operand >> 8) & 0xF) as usize
    }

    #[inline]
    pub fn b(self) -> usize {
        ((self.operand >> 4) & 0xF) as usize
    }

    #[inline]
    pub fn c(self) -> usize {
        (self.operand & 0xF) as usize
    }

    /// Immediate or address operand.
    #[inline]
    pub fn byte(self) -> u8 {
        (self.operand & 0xFF) as u8
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.opcode;
        match op.shape() {
            Shape::None => write!(f, "{op}"),
            Shape::Triple => write!(f, "{op} R{}, R{}, R{}", self.a(), self.b(), self.c()),
            Shape::Shift => write!(f, "{op} R{}, R0, R{}", self.a(), self.c()),
            Shape::RegImm => write!(f, "{op} R{}, {}", self.a(), self.byte()),
            Shape::Addr => write!(f, "{op} 0x{:02X}", self.byte()),
            Shape::Plot => write!(f, "{op} R{}, R{}", self.a(), self.b()),
            Shape::Reg => write!(f, "{op} R{}", self.a()),
        }
    }
}
