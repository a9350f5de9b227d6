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

use super::{ContextOperand, MemoryOperand, SelectLte, TierRange};

/// Instruction set of the expression VM.
///
/// Each instruction pops its inputs from the top of the stack and pushes its outputs. Instructions
/// taking `n` inputs from the operand fold them left to right, starting from the deepest value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum Instr {
    /// Pushes a constant or a copy of a stack item.
    #[display("read    {0}")]
    Read(MemoryOperand),

    /// Pushes a context cell.
    #[display("context {0}")]
    Context(ContextOperand),

    /// Pops a row number and pushes the cell at that row of the context column.
    #[display("ctxrow  {0}")]
    CtxRow(u8),

    /// Pops `n` values, failing if any of them is zero.
    #[display("ensure  {0}")]
    Ensure(u16),

    /// Checked addition of `n` values.
    #[display("add     {0}")]
    Add(u16),

    /// Checked subtraction of `n` values.
    #[display("sub     {0}")]
    Sub(u16),

    /// Checked multiplication of `n` values.
    #[display("mul     {0}")]
    Mul(u16),

    /// Integer division of `n` values, rounding down.
    #[display("div     {0}")]
    Div(u16),

    /// Remainder of dividing `n` values.
    #[display("rem     {0}")]
    Rem(u16),

    /// Checked exponentiation of `n` values.
    #[display("exp     {0}")]
    Exp(u16),

    /// Minimum of `n` values.
    #[display("min     {0}")]
    Min(u16),

    /// Maximum of `n` values.
    #[display("max     {0}")]
    Max(u16),

    /// Saturating addition of `n` values.
    #[display("adds    {0}")]
    AddSat(u16),

    /// Saturating subtraction of `n` values.
    #[display("subs    {0}")]
    SubSat(u16),

    /// Saturating multiplication of `n` values.
    #[display("muls    {0}")]
    MulSat(u16),

    #[display("iszero")]
    IsZero,

    #[display("eq")]
    Eq,

    #[display("lt")]
    Lt,

    #[display("gt")]
    Gt,

    /// Eager conditional: pops condition and two alternatives, pushes the first alternative if
    /// the condition is non-zero and the second one otherwise.
    #[display("eif")]
    Eif,

    /// Pushes first non-zero of `n` values, or zero.
    #[display("any     {0}")]
    Any(u16),

    /// Pushes first of `n` values if all of them are non-zero, or zero.
    #[display("every   {0}")]
    Every(u16),

    /// Rescales value with the given decimals into 18-decimal fixed point.
    #[display("scale18 {0}")]
    Scale18(u8),

    /// Rescales 18-decimal fixed point value into the given decimals.
    #[display("scalen  {0}")]
    ScaleN(u8),

    /// Multiplies or divides value by a power of ten.
    #[display("scaleby {0}")]
    ScaleBy(i8),

    /// Fixed-point multiplication, with the first argument in the given decimals.
    #[display("mul18   {0}")]
    Mul18(u8),

    /// Fixed-point division, with the first argument in the given decimals.
    #[display("div18   {0}")]
    Div18(u8),

    /// Reads scratch state under the key; absent keys read as zero.
    #[display("get")]
    Get,

    /// Writes value to the scratch state under the key.
    #[display("set")]
    Set,

    /// SHA256 hash of `n` values in big-endian encoding.
    #[display("hash    {0}")]
    Hash(u16),

    /// Splits a value into eight 32-bit parts.
    #[display("explode")]
    Explode,

    /// Time at which the report reached the tier.
    #[display("tierat  {0}")]
    TierAt(u8),

    /// Sets time for a range of tiers in the report.
    #[display("tierupd {0}")]
    TierUpd(TierRange),

    /// Tierwise saturating difference of two reports.
    #[display("tierdiff")]
    TierDiff,

    /// Tierwise selection over several reports.
    #[display("selectlte {0}")]
    SelectLte(SelectLte),
}
