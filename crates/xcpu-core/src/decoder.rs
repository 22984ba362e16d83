//! Instruction decoder for the XCPU ISA.
//!
//! Decoding is pure and total: every 16-bit word classifies into one of the
//! four operand classes, whether or not its opcode byte is assigned.

use crate::encoding::{
    classify_opcode, split_instruction_word, Opcode, OperandClass, EXTENDED_REGISTER_BIT,
    ONE_OPERAND_IMMEDIATE_BIT,
};
use crate::state::GeneralRegister;

/// Operand addressing for one-operand instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressingMode {
    /// The operand byte names a register in its high nibble.
    Register,
    /// The operand byte is a signed 8-bit immediate.
    Immediate,
}

/// Class-specific view of the operand byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operands {
    /// No operands.
    None,
    /// One register operand.
    Register(GeneralRegister),
    /// One signed 8-bit immediate.
    Immediate(i8),
    /// Two register operands `(reg1, reg2)`.
    Pair(GeneralRegister, GeneralRegister),
    /// A trailing 16-bit word, with a register operand when one is encoded.
    Extended {
        /// Register accompanying the immediate, if any.
        register: Option<GeneralRegister>,
    },
}

/// Decoded instruction word with all raw fields extracted.
///
/// Register and immediate fields are always populated from the operand byte;
/// which of them are meaningful depends on [`DecodedInstruction::class`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// The fetched word.
    pub word: u16,
    /// High byte of the word, used as the dispatch index.
    pub opcode_byte: u8,
    /// Assigned opcode, or `None` when the byte is unmapped.
    pub opcode: Option<Opcode>,
    /// Operand-count class selected by the two high opcode bits.
    pub class: OperandClass,
    /// Register-vs-immediate selection for one-operand instructions.
    pub addressing_mode: Option<AddressingMode>,
    /// First register field (bits 7..4 of the operand byte).
    pub reg1: GeneralRegister,
    /// Second register field (bits 3..0 of the operand byte).
    pub reg2: GeneralRegister,
    /// Operand byte reinterpreted as a signed immediate.
    pub immediate: i8,
    /// Extended instruction carrying a register next to its 16-bit word.
    pub has_register_operand: bool,
}

impl DecodedInstruction {
    /// Returns the operands this instruction's class actually uses.
    #[must_use]
    pub const fn operands(&self) -> Operands {
        match self.class {
            OperandClass::None => Operands::None,
            OperandClass::One => match self.addressing_mode {
                Some(AddressingMode::Immediate) => Operands::Immediate(self.immediate),
                _ => Operands::Register(self.reg1),
            },
            OperandClass::Two => Operands::Pair(self.reg1, self.reg2),
            OperandClass::Extended => Operands::Extended {
                register: if self.has_register_operand {
                    Some(self.reg1)
                } else {
                    None
                },
            },
        }
    }

    /// Total encoded length in bytes, including any trailing word.
    #[must_use]
    pub const fn length_bytes(&self) -> u16 {
        match self.class {
            OperandClass::Extended => 4,
            _ => 2,
        }
    }
}

/// Instruction decoder for the XCPU ISA.
pub struct Decoder;

impl Decoder {
    /// Decodes a 16-bit instruction word. Never fails.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn decode(word: u16) -> DecodedInstruction {
        let (opcode_byte, operand) = split_instruction_word(word);
        let class = OperandClass::from_opcode(opcode_byte);

        let addressing_mode = match class {
            OperandClass::One if opcode_byte & ONE_OPERAND_IMMEDIATE_BIT != 0 => {
                Some(AddressingMode::Immediate)
            }
            OperandClass::One => Some(AddressingMode::Register),
            _ => None,
        };

        DecodedInstruction {
            word,
            opcode_byte,
            opcode: classify_opcode(opcode_byte),
            class,
            addressing_mode,
            reg1: GeneralRegister::from_nibble(operand >> 4),
            reg2: GeneralRegister::from_nibble(operand),
            immediate: operand as i8,
            has_register_operand: matches!(class, OperandClass::Extended)
                && opcode_byte & EXTENDED_REGISTER_BIT != 0,
        }
    }
}
