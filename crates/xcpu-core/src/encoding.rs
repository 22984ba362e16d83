/// Opcode bits selecting the operand-count class (`XX` in `XXIO_OOOO`).
pub const OPERAND_CLASS_MASK: u8 = 0xC0;
/// Class-1 bit selecting an 8-bit immediate instead of a register operand.
pub const ONE_OPERAND_IMMEDIATE_BIT: u8 = 0x20;
/// Extended-class bit marking a register operand next to the 16-bit immediate.
pub const EXTENDED_REGISTER_BIT: u8 = 0x20;

/// Operand-count classes selected by the two high opcode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum OperandClass {
    /// `00`: no operands.
    None = 0,
    /// `01`: one register or one signed 8-bit immediate.
    One = 1,
    /// `10`: two register operands.
    Two = 2,
    /// `11`: a trailing 16-bit immediate, optionally with one register.
    Extended = 3,
}

impl OperandClass {
    /// Classifies an opcode byte by its two high bits. Total over all bytes.
    #[must_use]
    pub const fn from_opcode(opcode: u8) -> Self {
        match (opcode & OPERAND_CLASS_MASK) >> 6 {
            0 => Self::None,
            1 => Self::One,
            2 => Self::Two,
            _ => Self::Extended,
        }
    }
}

/// Canonical assigned XCPU opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    Bad = 0x00,
    Ret = 0x01,
    Cld = 0x02,
    Std = 0x03,
    Cli = 0x04,
    Sti = 0x05,
    Iret = 0x06,
    Trap = 0x07,
    Neg = 0x41,
    Not = 0x42,
    Push = 0x43,
    Pop = 0x44,
    Jmpr = 0x45,
    Callr = 0x46,
    Out = 0x47,
    Inc = 0x48,
    Dec = 0x49,
    Lit = 0x4A,
    Cpuid = 0x4B,
    Cpunum = 0x4C,
    Br = 0x61,
    Jr = 0x62,
    Add = 0x81,
    Sub = 0x82,
    Mul = 0x83,
    Div = 0x84,
    And = 0x85,
    Or = 0x86,
    Xor = 0x87,
    Shr = 0x88,
    Shl = 0x89,
    Test = 0x8A,
    Cmp = 0x8B,
    Equ = 0x8C,
    Mov = 0x8D,
    Load = 0x8E,
    Stor = 0x8F,
    Loadb = 0x90,
    Storb = 0x91,
    Loada = 0x92,
    Stora = 0x93,
    Tnset = 0x94,
    Jmp = 0xC1,
    Call = 0xC2,
    Loadi = 0xE1,
}

/// Single source-of-truth assigned opcode table with mnemonics.
///
/// Any opcode byte not present here is unmapped and halts the context.
pub const OPCODE_ENCODING_TABLE: &[(u8, Opcode, &str)] = &[
    (0x00, Opcode::Bad, "bad"),
    (0x01, Opcode::Ret, "ret"),
    (0x02, Opcode::Cld, "cld"),
    (0x03, Opcode::Std, "std"),
    (0x04, Opcode::Cli, "cli"),
    (0x05, Opcode::Sti, "sti"),
    (0x06, Opcode::Iret, "iret"),
    (0x07, Opcode::Trap, "trap"),
    (0x41, Opcode::Neg, "neg"),
    (0x42, Opcode::Not, "not"),
    (0x43, Opcode::Push, "push"),
    (0x44, Opcode::Pop, "pop"),
    (0x45, Opcode::Jmpr, "jmpr"),
    (0x46, Opcode::Callr, "callr"),
    (0x47, Opcode::Out, "out"),
    (0x48, Opcode::Inc, "inc"),
    (0x49, Opcode::Dec, "dec"),
    (0x4A, Opcode::Lit, "lit"),
    (0x4B, Opcode::Cpuid, "cpuid"),
    (0x4C, Opcode::Cpunum, "cpunum"),
    (0x61, Opcode::Br, "br"),
    (0x62, Opcode::Jr, "jr"),
    (0x81, Opcode::Add, "add"),
    (0x82, Opcode::Sub, "sub"),
    (0x83, Opcode::Mul, "mul"),
    (0x84, Opcode::Div, "div"),
    (0x85, Opcode::And, "and"),
    (0x86, Opcode::Or, "or"),
    (0x87, Opcode::Xor, "xor"),
    (0x88, Opcode::Shr, "shr"),
    (0x89, Opcode::Shl, "shl"),
    (0x8A, Opcode::Test, "test"),
    (0x8B, Opcode::Cmp, "cmp"),
    (0x8C, Opcode::Equ, "equ"),
    (0x8D, Opcode::Mov, "mov"),
    (0x8E, Opcode::Load, "load"),
    (0x8F, Opcode::Stor, "stor"),
    (0x90, Opcode::Loadb, "loadb"),
    (0x91, Opcode::Storb, "storb"),
    (0x92, Opcode::Loada, "loada"),
    (0x93, Opcode::Stora, "stora"),
    (0x94, Opcode::Tnset, "tnset"),
    (0xC1, Opcode::Jmp, "jmp"),
    (0xC2, Opcode::Call, "call"),
    (0xE1, Opcode::Loadi, "loadi"),
];

impl Opcode {
    /// Returns the opcode byte for this instruction.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the operand class implied by the opcode's high bits.
    #[must_use]
    pub const fn class(self) -> OperandClass {
        OperandClass::from_opcode(self.as_u8())
    }

    /// Returns the assembler mnemonic for this opcode.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        OPCODE_ENCODING_TABLE
            .iter()
            .find_map(|(_, opcode, name)| (*opcode == self).then_some(*name))
            .unwrap_or("bad")
    }
}

/// Returns the assigned opcode for an opcode byte.
///
/// `None` means the byte is unmapped.
#[must_use]
pub fn classify_opcode(byte: u8) -> Option<Opcode> {
    OPCODE_ENCODING_TABLE
        .iter()
        .find_map(|(entry, opcode, _)| (*entry == byte).then_some(*opcode))
}

/// Splits an instruction word into `(opcode, operand)` bytes.
#[must_use]
pub const fn split_instruction_word(word: u16) -> (u8, u8) {
    ((word >> 8) as u8, (word & 0x00FF) as u8)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{classify_opcode, split_instruction_word, Opcode, OperandClass, OPCODE_ENCODING_TABLE};

    #[test]
    fn table_contains_unique_opcode_bytes_and_mnemonics() {
        let bytes: HashSet<_> = OPCODE_ENCODING_TABLE.iter().map(|(b, _, _)| *b).collect();
        let names: HashSet<_> = OPCODE_ENCODING_TABLE.iter().map(|(_, _, n)| *n).collect();
        assert_eq!(bytes.len(), OPCODE_ENCODING_TABLE.len());
        assert_eq!(names.len(), OPCODE_ENCODING_TABLE.len());
    }

    #[test]
    fn every_table_entry_matches_its_discriminant() {
        for (byte, opcode, _) in OPCODE_ENCODING_TABLE {
            assert_eq!(opcode.as_u8(), *byte);
            assert_eq!(classify_opcode(*byte), Some(*opcode));
        }
    }

    #[test]
    fn class_bits_match_assigned_groups() {
        assert_eq!(Opcode::Trap.class(), OperandClass::None);
        assert_eq!(Opcode::Cpunum.class(), OperandClass::One);
        assert_eq!(Opcode::Jr.class(), OperandClass::One);
        assert_eq!(Opcode::Tnset.class(), OperandClass::Two);
        assert_eq!(Opcode::Call.class(), OperandClass::Extended);
        assert_eq!(Opcode::Loadi.class(), OperandClass::Extended);
    }

    #[test]
    fn unassigned_bytes_are_unmapped() {
        for byte in [0x08_u8, 0x40, 0x4D, 0x60, 0x63, 0x80, 0x95, 0xC0, 0xC3, 0xE2, 0xFF] {
            assert_eq!(classify_opcode(byte), None, "byte {byte:#04x}");
        }
    }

    #[test]
    fn mnemonics_resolve_through_table() {
        assert_eq!(Opcode::Loadi.mnemonic(), "loadi");
        assert_eq!(Opcode::Tnset.mnemonic(), "tnset");
        assert_eq!(Opcode::Bad.mnemonic(), "bad");
    }

    #[test]
    fn instruction_word_splits_high_and_low_bytes() {
        assert_eq!(split_instruction_word(0x8110), (0x81, 0x10));
        assert_eq!(split_instruction_word(0x00FF), (0x00, 0xFF));
    }
}
