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

//! Typed views on 16-bit instruction operands.

use crate::data::tier::TIER_COUNT;
use crate::data::{TierLogic, TierMode};

/// Maximal index addressable by a [`MemoryOperand`].
pub const MEMORY_INDEX_MAX: u16 = 0x7FFF;

/// Memory region addressed by the `read` instruction.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
#[repr(u8)]
pub enum MemoryType {
    /// Evaluation stack, indexed from the bottom.
    #[display("stack")]
    Stack = 0,

    /// Constants pool of the evaluable.
    #[display("constant")]
    Constant = 1,
}

/// Memory operand: type tag in the lowest bit, index in the higher 15 bits.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
#[display("{ty} {index}")]
pub struct MemoryOperand {
    pub ty: MemoryType,
    pub index: u16,
}

impl MemoryOperand {
    /// Addresses constant at `index`, if it fits into 15 bits.
    #[inline]
    pub const fn constant(index: u16) -> Option<Self> { Self::with(MemoryType::Constant, index) }

    /// Addresses stack item at `index`, if it fits into 15 bits.
    #[inline]
    pub const fn stack(index: u16) -> Option<Self> { Self::with(MemoryType::Stack, index) }

    pub const fn with(ty: MemoryType, index: u16) -> Option<Self> {
        if index > MEMORY_INDEX_MAX {
            return None;
        }
        Some(MemoryOperand { ty, index })
    }

    #[inline]
    pub fn to_u16(self) -> u16 { (self.index << 1) | self.ty as u16 }

    #[inline]
    pub fn from_u16(operand: u16) -> Self {
        let ty = match operand & 1 {
            0 => MemoryType::Stack,
            _ => MemoryType::Constant,
        };
        MemoryOperand { ty, index: operand >> 1 }
    }
}

/// Context cell address: column in the high byte, row in the low byte.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
#[display("{column}, {row}")]
pub struct ContextOperand {
    pub column: u8,
    pub row: u8,
}

impl ContextOperand {
    #[inline]
    pub fn new(column: u8, row: u8) -> Self { ContextOperand { column, row } }

    #[inline]
    pub fn to_u16(self) -> u16 { (self.column as u16) << 8 | self.row as u16 }

    #[inline]
    pub fn from_u16(operand: u16) -> Self {
        let [column, row] = operand.to_be_bytes();
        ContextOperand { column, row }
    }
}

/// Range of tier slots `[start, end)` updated by `tierupd`: start in bits 0-3, end in bits 4-7.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
#[display("{start}, {end}")]
pub struct TierRange {
    pub start: u8,
    pub end: u8,
}

impl TierRange {
    /// Constructs range, if `start <= end <= 8`.
    pub const fn new(start: u8, end: u8) -> Option<Self> {
        if start > end || end > TIER_COUNT {
            return None;
        }
        Some(TierRange { start, end })
    }

    #[inline]
    pub fn to_u16(self) -> u16 { self.start as u16 | (self.end as u16) << 4 }

    pub fn from_u16(operand: u16) -> Option<Self> {
        if operand >> 8 != 0 {
            return None;
        }
        TierRange::new((operand & 0x0F) as u8, (operand >> 4 & 0x0F) as u8)
    }
}

/// Operand of `selectlte`: number of reports in bits 0-7, [`TierMode`] in bits 8-9 and
/// [`TierLogic`] in bit 10.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
#[display("{logic} {mode} {length}")]
pub struct SelectLte {
    pub logic: TierLogic,
    pub mode: TierMode,
    pub length: u8,
}

impl SelectLte {
    #[inline]
    pub fn new(logic: TierLogic, mode: TierMode, length: u8) -> Self {
        SelectLte {
            logic,
            mode,
            length,
        }
    }

    #[inline]
    pub fn to_u16(self) -> u16 {
        self.length as u16 | (self.mode as u16) << 8 | (self.logic as u16) << 10
    }

    pub fn from_u16(operand: u16) -> Option<Self> {
        if operand >> 11 != 0 {
            return None;
        }
        Some(SelectLte {
            logic: TierLogic::with((operand >> 10 & 1) as u8)?,
            mode: TierMode::with((operand >> 8 & 0b11) as u8)?,
            length: (operand & 0xFF) as u8,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::isa::Instr;

    #[test]
    fn memory_layout() {
        assert_eq!(MemoryOperand::constant(3).unwrap().to_u16(), 0b111);
        assert_eq!(MemoryOperand::stack(3).unwrap().to_u16(), 0b110);
        assert_eq!(MemoryOperand::constant(3), Some(MemoryOperand::from_u16(0b111)));
        assert_eq!(MemoryOperand::from_u16(u16::MAX).index, MEMORY_INDEX_MAX);
        assert_eq!(MemoryOperand::constant(MEMORY_INDEX_MAX).map(|op| op.index), Some(MEMORY_INDEX_MAX));
        assert_eq!(MemoryOperand::constant(0x8001), None);
        assert_eq!(MemoryOperand::stack(40000), None);
    }

    #[test]
    fn assembler_operands() {
        let code = exprasm! {
            read    constant 32767;
            read    stack 0;
            tierupd 1, 3;
        };
        assert_eq!(code, vec![
            Instr::Read(MemoryOperand {
                ty: MemoryType::Constant,
                index: MEMORY_INDEX_MAX,
            }),
            Instr::Read(MemoryOperand {
                ty: MemoryType::Stack,
                index: 0,
            }),
            Instr::TierUpd(TierRange { start: 1, end: 3 }),
        ]);
    }

    #[test]
    fn context_layout() {
        let op = ContextOperand::new(15, 255);
        assert_eq!(op.to_u16(), 0x0FFF);
        assert_eq!(ContextOperand::from_u16(0x0102), ContextOperand::new(1, 2));
    }

    #[test]
    fn tier_range() {
        assert_eq!(TierRange::new(0, 8).map(TierRange::to_u16), Some(0x80));
        assert_eq!(TierRange::from_u16(0x31), TierRange::new(1, 3));
        assert_eq!(TierRange::new(3, 1), None);
        assert_eq!(TierRange::from_u16(0x90), None);
        assert_eq!(TierRange::from_u16(0x100), None);
    }

    #[test]
    fn select_lte_layout() {
        let op = SelectLte::new(TierLogic::Any, TierMode::First, 5);
        assert_eq!(op.to_u16(), 5 | 2 << 8 | 1 << 10);
        assert_eq!(SelectLte::from_u16(op.to_u16()), Some(op));
        assert_eq!(SelectLte::from_u16(3 << 8), None);
        assert_eq!(SelectLte::from_u16(1 << 11), None);
    }
}
