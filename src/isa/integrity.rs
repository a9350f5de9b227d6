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

//! Static stack effects and operand constraints used by the integrity check.

use super::{Instr, MemoryType};
use crate::core::CONTEXT_COLUMNS_MAX;

/// Instruction operand violating static constraints.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display(doc_comments)]
pub enum OperandError {
    /// reference to constant #{0} while only {1} constants are present.
    ConstantOutOfRange(u16, u16),

    /// read of stack item {0} while the stack height is {1}.
    StackReadOutOfRange(u16, u16),

    /// context column {0} is outside of the context matrix.
    ContextColumnOutOfRange(u8),

    /// instruction requires at least {0} inputs.
    ArityTooSmall(u16),
}

impl Instr {
    /// Number of values the instruction pops from the stack.
    pub fn stack_inputs(&self) -> u16 {
        match *self {
            Instr::Read(_) | Instr::Context(_) => 0,
            Instr::CtxRow(_)
            | Instr::IsZero
            | Instr::Scale18(_)
            | Instr::ScaleN(_)
            | Instr::ScaleBy(_)
            | Instr::Get
            | Instr::Explode
            | Instr::TierAt(_) => 1,
            Instr::Eq
            | Instr::Lt
            | Instr::Gt
            | Instr::Mul18(_)
            | Instr::Div18(_)
            | Instr::Set
            | Instr::TierUpd(_)
            | Instr::TierDiff => 2,
            Instr::Eif => 3,
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
            Instr::SelectLte(op) => op.length as u16 + 1,
        }
    }

    /// Number of values the instruction pushes to the stack.
    pub fn stack_outputs(&self) -> u16 {
        match self {
            Instr::Ensure(_) | Instr::Set => 0,
            Instr::Explode => 8,
            _ => 1,
        }
    }

    /// Minimal operand-encoded arity of variadic instructions.
    pub fn min_arity(&self) -> u16 {
        match self {
            Instr::Add(_)
            | Instr::Sub(_)
            | Instr::Mul(_)
            | Instr::Div(_)
            | Instr::Rem(_)
            | Instr::Exp(_)
            | Instr::Min(_)
            | Instr::Max(_)
            | Instr::AddSat(_)
            | Instr::SubSat(_)
            | Instr::MulSat(_) => 2,
            Instr::Ensure(_) | Instr::Any(_) | Instr::Every(_) | Instr::Hash(_) => 1,
            Instr::SelectLte(_) => 2,
            _ => 0,
        }
    }

    /// Checks instruction operand against the stack `height` before the instruction and the
    /// size of the constants pool.
    pub fn check_operands(&self, height: u16, constants: u16) -> Result<(), OperandError> {
        if self.stack_inputs() < self.min_arity() {
            return Err(OperandError::ArityTooSmall(self.min_arity()));
        }
        match *self {
            Instr::Read(op) if op.ty == MemoryType::Constant && op.index >= constants => {
                Err(OperandError::ConstantOutOfRange(op.index, constants))
            }
            Instr::Read(op) if op.ty == MemoryType::Stack && op.index >= height => {
                Err(OperandError::StackReadOutOfRange(op.index, height))
            }
            Instr::Context(op) if op.column as usize >= CONTEXT_COLUMNS_MAX => {
                Err(OperandError::ContextColumnOutOfRange(op.column))
            }
            Instr::CtxRow(column) if column as usize >= CONTEXT_COLUMNS_MAX => {
                Err(OperandError::ContextColumnOutOfRange(column))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{TierLogic, TierMode};
    use crate::isa::{ContextOperand, MemoryOperand, SelectLte};

    #[test]
    fn stack_effects() {
        assert_eq!((Instr::Add(3).stack_inputs(), Instr::Add(3).stack_outputs()), (3, 1));
        assert_eq!((Instr::Ensure(2).stack_inputs(), Instr::Ensure(2).stack_outputs()), (2, 0));
        assert_eq!((Instr::Explode.stack_inputs(), Instr::Explode.stack_outputs()), (1, 8));
        let select = Instr::SelectLte(SelectLte::new(TierLogic::Any, TierMode::Max, 3));
        assert_eq!(select.stack_inputs(), 4);
    }

    #[test]
    fn operand_constraints() {
        assert_eq!(Instr::Add(1).check_operands(5, 0), Err(OperandError::ArityTooSmall(2)));
        assert_eq!(Instr::Ensure(0).check_operands(5, 0), Err(OperandError::ArityTooSmall(1)));
        assert_eq!(
            Instr::Read(MemoryOperand::constant(2).unwrap()).check_operands(0, 2),
            Err(OperandError::ConstantOutOfRange(2, 2))
        );
        assert_eq!(
            Instr::Read(MemoryOperand::stack(1).unwrap()).check_operands(1, 0),
            Err(OperandError::StackReadOutOfRange(1, 1))
        );
        assert_eq!(Instr::Read(MemoryOperand::stack(0).unwrap()).check_operands(1, 0), Ok(()));
        assert_eq!(
            Instr::Context(ContextOperand::new(16, 0)).check_operands(0, 0),
            Err(OperandError::ContextColumnOutOfRange(16))
        );
        assert_eq!(Instr::Context(ContextOperand::new(15, 255)).check_operands(0, 0), Ok(()));
        let select = Instr::SelectLte(SelectLte::new(TierLogic::Any, TierMode::Max, 0));
        assert_eq!(select.check_operands(5, 0), Err(OperandError::ArityTooSmall(2)));
    }
}
