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

use core::fmt::{Debug, Display};

use amplify::num::u256;

use super::{Bytecode, Instr, MemoryType};
use crate::core::{message_hash, ArithmeticMode, Context, Core, Fault};
use crate::data::{self, tier, word_from_bool, word_to_u32, word_to_u64, MathError};

/// Turing machine movement after instruction execution
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ExecStep {
    /// Move to the next instruction
    Next,

    /// Abort evaluation
    Fail(Fault),
}

/// Data external to the core which are accessible to the instructions.
#[derive(Copy, Clone, Debug)]
pub struct EvalContext<'ctx> {
    /// Context matrix of the call.
    pub context: &'ctx Context,
    /// Constants pool of the evaluated program.
    pub constants: &'ctx [u256],
}

/// Trait for instructions
pub trait InstructionSet: Bytecode + Display + Debug {
    /// Context: external data which are accessible to the ISA.
    type Context<'ctx>;

    /// Returns computational complexity of the instruction
    #[inline]
    fn complexity(&self) -> u64 { 1 }

    /// Executes given instruction taking the core stack as input and output.
    fn exec(&self, core: &mut Core, context: &Self::Context<'_>) -> ExecStep;
}

impl InstructionSet for Instr {
    type Context<'ctx> = EvalContext<'ctx>;

    fn complexity(&self) -> u64 {
        match self {
            Instr::Exp(_) => 8,
            Instr::Hash(n) => *n as u64,
            Instr::SelectLte(op) => 8 * op.length as u64,
            _ => 1,
        }
    }

    fn exec(&self, core: &mut Core, context: &EvalContext<'_>) -> ExecStep {
        match self.exec_inner(core, context) {
            Ok(()) => ExecStep::Next,
            Err(fault) => ExecStep::Fail(fault),
        }
    }
}

fn fold(
    core: &mut Core,
    n: u16,
    op: impl Fn(u256, u256) -> Result<u256, Fault>,
) -> Result<(), Fault> {
    let mut values = core.pop_many(n)?.into_iter();
    let mut acc = values.next().ok_or(Fault::StackUnderflow)?;
    for val in values {
        acc = op(acc, val)?;
    }
    core.push(acc)
}

fn unary(core: &mut Core, op: impl FnOnce(u256) -> Result<u256, Fault>) -> Result<(), Fault> {
    let a = core.pop()?;
    core.push(op(a)?)
}

fn binary(core: &mut Core, op: impl FnOnce(u256, u256) -> Result<u256, Fault>) -> Result<(), Fault> {
    let b = core.pop()?;
    let a = core.pop()?;
    core.push(op(a, b)?)
}

impl Instr {
    fn exec_inner(&self, core: &mut Core, ctx: &EvalContext<'_>) -> Result<(), Fault> {
        let mode = core.arithmetic();
        match *self {
            Instr::Read(op) => {
                let val = match op.ty {
                    MemoryType::Stack => core.read(op.index)?,
                    MemoryType::Constant => ctx
                        .constants
                        .get(op.index as usize)
                        .copied()
                        .ok_or(Fault::ConstantOutOfBounds(op.index))?,
                };
                core.push(val)
            }
            Instr::Context(op) => {
                let val = ctx
                    .context
                    .cell(op.column, op.row as usize)
                    .ok_or(Fault::ContextOutOfBounds(op.column, op.row as u64))?;
                core.push(val)
            }
            Instr::CtxRow(column) => {
                let row = core.pop()?;
                let row = word_to_u64(row).unwrap_or(u64::MAX);
                let val = usize::try_from(row)
                    .ok()
                    .and_then(|row| ctx.context.cell(column, row))
                    .ok_or(Fault::ContextOutOfBounds(column, row))?;
                core.push(val)
            }
            Instr::Ensure(n) => {
                let values = core.pop_many(n)?;
                match values.iter().position(|val| *val == u256::ZERO) {
                    Some(pos) => Err(Fault::EnsureFailed(pos as u16)),
                    None if values.is_empty() => Err(Fault::StackUnderflow),
                    None => Ok(()),
                }
            }

            Instr::Add(n) => fold(core, n, |a, b| match mode {
                ArithmeticMode::Checked => a.checked_add(b).ok_or(Fault::Overflow),
                ArithmeticMode::Wrapping => Ok(a.wrapping_add(b)),
            }),
            Instr::Sub(n) => fold(core, n, |a, b| match mode {
                ArithmeticMode::Checked => a.checked_sub(b).ok_or(Fault::Underflow),
                ArithmeticMode::Wrapping => Ok(a.wrapping_sub(b)),
            }),
            Instr::Mul(n) => fold(core, n, |a, b| match mode {
                ArithmeticMode::Checked => a.checked_mul(b).ok_or(Fault::Overflow),
                ArithmeticMode::Wrapping => Ok(a.wrapping_mul(b)),
            }),
            Instr::Div(n) => fold(core, n, |a, b| {
                if b == u256::ZERO {
                    return Err(Fault::DivisionByZero);
                }
                Ok(a / b)
            }),
            Instr::Rem(n) => fold(core, n, |a, b| {
                if b == u256::ZERO {
                    return Err(Fault::DivisionByZero);
                }
                Ok(a % b)
            }),
            Instr::Exp(n) => fold(core, n, |a, b| match mode {
                ArithmeticMode::Checked => data::checked_pow(a, b).map_err(Fault::from),
                ArithmeticMode::Wrapping => Ok(data::wrapping_pow(a, b)),
            }),
            Instr::Min(n) => fold(core, n, |a, b| Ok(a.min(b))),
            Instr::Max(n) => fold(core, n, |a, b| Ok(a.max(b))),
            Instr::AddSat(n) => fold(core, n, |a, b| Ok(a.saturating_add(b))),
            Instr::SubSat(n) => fold(core, n, |a, b| Ok(a.checked_sub(b).unwrap_or(u256::ZERO))),
            Instr::MulSat(n) => fold(core, n, |a, b| Ok(a.saturating_mul(b))),

            Instr::IsZero => unary(core, |a| Ok(word_from_bool(a == u256::ZERO))),
            Instr::Eq => binary(core, |a, b| Ok(word_from_bool(a == b))),
            Instr::Lt => binary(core, |a, b| Ok(word_from_bool(a < b))),
            Instr::Gt => binary(core, |a, b| Ok(word_from_bool(a > b))),
            Instr::Eif => {
                let no = core.pop()?;
                let yes = core.pop()?;
                let condition = core.pop()?;
                core.push(if condition != u256::ZERO { yes } else { no })
            }
            Instr::Any(n) => {
                let values = core.pop_many(n)?;
                let val = values.into_iter().find(|val| *val != u256::ZERO);
                core.push(val.unwrap_or(u256::ZERO))
            }
            Instr::Every(n) => {
                let values = core.pop_many(n)?;
                let val = match values.first() {
                    Some(first) if values.iter().all(|val| *val != u256::ZERO) => *first,
                    _ => u256::ZERO,
                };
                core.push(val)
            }

            Instr::Scale18(decimals) => unary(core, |a| Ok(data::scale18(a, decimals)?)),
            Instr::ScaleN(decimals) => unary(core, |a| Ok(data::scale_n(a, decimals)?)),
            Instr::ScaleBy(scale) => unary(core, |a| Ok(data::scale_by(a, scale)?)),
            Instr::Mul18(decimals) => binary(core, |a, b| {
                Ok(data::fixed_point_mul(data::scale18(a, decimals)?, b)?)
            }),
            Instr::Div18(decimals) => binary(core, |a, b| {
                Ok(data::fixed_point_div(data::scale18(a, decimals)?, b)?)
            }),

            Instr::Get => {
                let key = core.pop()?;
                let val = core.state().get(key);
                core.push(val)
            }
            Instr::Set => {
                let val = core.pop()?;
                let key = core.pop()?;
                core.state_mut().set(key, val);
                Ok(())
            }

            Instr::Hash(n) => {
                let values = core.pop_many(n)?;
                core.push(u256::from_be_bytes(message_hash(&values)))
            }
            Instr::Explode => {
                let word = core.pop()?;
                for part in tier::explode32(word) {
                    core.push(u256::from(part as u64))?;
                }
                Ok(())
            }

            Instr::TierAt(level) => unary(core, |report| {
                Ok(u256::from(tier::report_time_for_tier(report, level) as u64))
            }),
            Instr::TierUpd(range) => binary(core, |report, time| {
                let time = word_to_u32(time).ok_or(MathError::Overflow)?;
                Ok(tier::update_times_for_tier_range(report, range.start, range.end, time))
            }),
            Instr::TierDiff => binary(core, |newer, older| Ok(tier::saturating_diff(newer, older))),
            Instr::SelectLte(op) => {
                let reference = core.pop()?;
                let reference = word_to_u32(reference).unwrap_or(u32::MAX);
                let reports = core.pop_many(op.length as u16)?;
                let report = tier::select_lte(&reports, reference, op.logic, op.mode);
                core.push(report)
            }
        }
    }
}
