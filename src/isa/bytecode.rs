// ExprVM: deterministic sandboxed expression virtual machine.
// Rust implementation of the expression interpreter and the order-matching engine built on it.
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2021-2024 by
//     Dr Maxim Orlovsky <orlovsky@ubideco.org>
//
// Copyright (C) 2021-2024 UBIDECO Labs,
//     Laboratories for Distributed and Cognitive Computing, Switzerland.
//     All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::opcodes::*;
use super::{ContextOperand, Instr, MemoryOperand, SelectLte, TierRange};

/// Fixed width of a single encoded instruction, in bytes.
pub const INSTR_SIZE: u16 = 4;

/// Non-failing byte encoding for the instruction set.
///
/// Each instruction is encoded as a big-endian 16-bit opcode followed by a big-endian 16-bit
/// operand.
pub trait Bytecode {
    /// Returns opcode of the instruction (without its operand).
    fn opcode(&self) -> u16;

    /// Returns 16-bit operand of the instruction.
    fn operand(&self) -> u16;

    /// Write an instruction as bytecode.
    fn encode_instr<W>(&self, writer: &mut W) -> Result<(), W::Error>
    where W: BytecodeWrite {
        writer.write_word(self.opcode())?;
        writer.write_word(self.operand())
    }

    /// Reads an instruction from bytecode.
    fn decode_instr<R>(reader: &mut R) -> Result<Self, DecodeError>
    where
        Self: Sized,
        R: BytecodeRead,
    {
        let opcode = reader.read_word()?;
        let operand = reader.read_word()?;
        Self::decode_operands(opcode, operand)
    }

    /// Constructs an instruction from its opcode and raw operand.
    fn decode_operands(opcode: u16, operand: u16) -> Result<Self, DecodeError>
    where Self: Sized;
}

/// Error indicating that an end of code segment boundary is reached during read or write operation.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display("attempt to read or write outside of code segment (i.e. at position > 0xFFFF)")]
pub struct CodeEofError;

/// Errors decoding instructions from a source bytecode.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum DecodeError {
    /// unexpected end of the source bytecode.
    #[from(CodeEofError)]
    Eof,

    /// unknown opcode {0}.
    UnknownOpcode(u16),

    /// invalid operand {1} for the instruction with opcode {0}.
    InvalidOperand(u16, u16),
}

/// Reader from a bytecode for instruction deserialization.
pub trait BytecodeRead {
    /// Return current byte offset of the cursor.
    fn pos(&self) -> u16;
    /// Return whether end of the bytecode is reached.
    fn is_eof(&self) -> bool;
    /// Read big-endian word.
    fn read_word(&mut self) -> Result<u16, CodeEofError>;
}

/// Writer converting instructions into a bytecode.
pub trait BytecodeWrite {
    type Error;

    /// Write big-endian word.
    fn write_word(&mut self, data: u16) -> Result<(), Self::Error>;
}

impl Bytecode for Instr {
    fn opcode(&self) -> u16 {
        match self {
            Instr::Read(_) => INSTR_READ,
            Instr::Context(_) => INSTR_CONTEXT,
            Instr::CtxRow(_) => INSTR_CTXROW,
            Instr::Ensure(_) => INSTR_ENSURE,
            Instr::Add(_) => INSTR_ADD,
            Instr::Sub(_) => INSTR_SUB,
            Instr::Mul(_) => INSTR_MUL,
            Instr::Div(_) => INSTR_DIV,
            Instr::Rem(_) => INSTR_REM,
            Instr::Exp(_) => INSTR_EXP,
            Instr::Min(_) => INSTR_MIN,
            Instr::Max(_) => INSTR_MAX,
            Instr::AddSat(_) => INSTR_ADDS,
            Instr::SubSat(_) => INSTR_SUBS,
            Instr::MulSat(_) => INSTR_MULS,
            Instr::IsZero => INSTR_ISZERO,
            Instr::Eq => INSTR_EQ,
            Instr::Lt => INSTR_LT,
            Instr::Gt => INSTR_GT,
            Instr::Eif => INSTR_EIF,
            Instr::Any(_) => INSTR_ANY,
            Instr::Every(_) => INSTR_EVERY,
            Instr::Scale18(_) => INSTR_SCALE18,
            Instr::ScaleN(_) => INSTR_SCALEN,
            Instr::ScaleBy(_) => INSTR_SCALEBY,
            Instr::Mul18(_) => INSTR_MUL18,
            Instr::Div18(_) => INSTR_DIV18,
            Instr::Get => INSTR_GET,
            Instr::Set => INSTR_SET,
            Instr::Hash(_) => INSTR_HASH,
            Instr::Explode => INSTR_EXPLODE,
            Instr::TierAt(_) => INSTR_TIERAT,
            Instr::TierUpd(_) => INSTR_TIERUPD,
            Instr::TierDiff => INSTR_TIERDIFF,
            Instr::SelectLte(_) => INSTR_SELECTLTE,
        }
    }

    fn operand(&self) -> u16 {
        match *self {
            Instr::Read(op) => op.to_u16(),
            Instr::Context(op) => op.to_u16(),
            Instr::CtxRow(column) => column as u16,
            Instr::Ensure(n)
            | Instr::Add(n)
            | Instr::Sub(n)
            | Instr::Mul(n)
            | Instr::Div(n)
            | Instr::Rem(n)
            | Instr::Exp(n)
            | Instr::Min(n)
            | Instr::Max(n)
            | Instr::AddSat(n)
            | Instr::SubSat(n)
            | Instr::MulSat(n)
            | Instr::Any(n)
            | Instr::Every(n)
            | Instr::Hash(n) => n,
            Instr::Scale18(decimals)
            | Instr::ScaleN(decimals)
            | Instr::Mul18(decimals)
            | Instr::Div18(decimals) => decimals as u16,
            Instr::ScaleBy(scale) => scale as u8 as u16,
            Instr::TierAt(tier) => tier as u16,
            Instr::TierUpd(range) => range.to_u16(),
            Instr::SelectLte(op) => op.to_u16(),
            Instr::IsZero
            | Instr::Eq
            | Instr::Lt
            | Instr::Gt
            | Instr::Eif
            | Instr::Get
            | Instr::Set
            | Instr::Explode
            | Instr::TierDiff => 0,
        }
    }

    fn decode_operands(opcode: u16, operand: u16) -> Result<Self, DecodeError> {
        let invalid = DecodeError::InvalidOperand(opcode, operand);
        let byte = || u8::try_from(operand).map_err(|_| invalid);
        let none = |instr: Instr| if operand == 0 { Ok(instr) } else { Err(invalid) };
        Ok(match opcode {
            INSTR_READ => Instr::Read(MemoryOperand::from_u16(operand)),
            INSTR_CONTEXT => Instr::Context(ContextOperand::from_u16(operand)),
            INSTR_CTXROW => Instr::CtxRow(byte()?),
            INSTR_ENSURE => Instr::Ensure(operand),
            INSTR_ADD => Instr::Add(operand),
            INSTR_SUB => Instr::Sub(operand),
            INSTR_MUL => Instr::Mul(operand),
            INSTR_DIV => Instr::Div(operand),
            INSTR_REM => Instr::Rem(operand),
            INSTR_EXP => Instr::Exp(operand),
            INSTR_MIN => Instr::Min(operand),
            INSTR_MAX => Instr::Max(operand),
            INSTR_ADDS => Instr::AddSat(operand),
            INSTR_SUBS => Instr::SubSat(operand),
            INSTR_MULS => Instr::MulSat(operand),
            INSTR_ISZERO => none(Instr::IsZero)?,
            INSTR_EQ => none(Instr::Eq)?,
            INSTR_LT => none(Instr::Lt)?,
            INSTR_GT => none(Instr::Gt)?,
            INSTR_EIF => none(Instr::Eif)?,
            INSTR_ANY => Instr::Any(operand),
            INSTR_EVERY => Instr::Every(operand),
            INSTR_SCALE18 => Instr::Scale18(byte()?),
            INSTR_SCALEN => Instr::ScaleN(byte()?),
            INSTR_SCALEBY => Instr::ScaleBy(byte()? as i8),
            INSTR_MUL18 => Instr::Mul18(byte()?),
            INSTR_DIV18 => Instr::Div18(byte()?),
            INSTR_GET => none(Instr::Get)?,
            INSTR_SET => none(Instr::Set)?,
            INSTR_HASH => Instr::Hash(operand),
            INSTR_EXPLODE => none(Instr::Explode)?,
            INSTR_TIERAT => match byte()? {
                tier if tier <= crate::data::tier::TIER_COUNT => Instr::TierAt(tier),
                _ => return Err(invalid),
            },
            INSTR_TIERUPD => Instr::TierUpd(TierRange::from_u16(operand).ok_or(invalid)?),
            INSTR_TIERDIFF => none(Instr::TierDiff)?,
            INSTR_SELECTLTE => Instr::SelectLte(SelectLte::from_u16(operand).ok_or(invalid)?),
            _ => return Err(DecodeError::UnknownOpcode(opcode)),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{TierLogic, TierMode};

    #[test]
    fn opcode_table() {
        assert_eq!(Instr::Read(MemoryOperand::constant(0).unwrap()).opcode(), 0);
        assert_eq!(Instr::Add(2).opcode(), 4);
        assert_eq!(Instr::MulSat(2).opcode(), 14);
        assert_eq!(Instr::Set.opcode(), 28);
        assert_eq!(Instr::SelectLte(SelectLte::new(TierLogic::Every, TierMode::Min, 1)).opcode(), 34);
    }

    #[test]
    fn operand_checks() {
        assert_eq!(Instr::decode_operands(INSTR_SCALEBY, 0xFA), Ok(Instr::ScaleBy(-6)));
        assert_eq!(Instr::ScaleBy(-6).operand(), 0xFA);
        assert_eq!(
            Instr::decode_operands(INSTR_EQ, 1),
            Err(DecodeError::InvalidOperand(INSTR_EQ, 1))
        );
        assert_eq!(
            Instr::decode_operands(INSTR_SCALE18, 0x100),
            Err(DecodeError::InvalidOperand(INSTR_SCALE18, 0x100))
        );
        assert_eq!(
            Instr::decode_operands(INSTR_TIERAT, 9),
            Err(DecodeError::InvalidOperand(INSTR_TIERAT, 9))
        );
        assert_eq!(Instr::decode_operands(INSTR_COUNT, 0), Err(DecodeError::UnknownOpcode(INSTR_COUNT)));
    }
}
