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

/// Macro compiler for the expression VM assembler.
///
/// # Example
///
/// ```
/// use exprvm::evaluable::{assemble, EvaluableConfig};
/// use exprvm::{exprasm, Context, Dispatch, Evaluable, Interpreter};
/// use amplify::num::u256;
///
/// let code = exprasm! {
///     read    constant 0;
///     read    constant 1;
///     add     2;
/// };
///
/// let config = EvaluableConfig {
///     sources: vec![assemble(&code).unwrap()],
///     constants: vec![u256::from(2u64), u256::from(3u64)],
/// };
/// let evaluable = Evaluable::new(config).unwrap();
/// let outcome = Interpreter::new()
///     .eval(&evaluable, Dispatch::new(0, 1), &Context::empty())
///     .unwrap();
/// assert_eq!(outcome.stack_top(), Some(u256::from(5u64)));
/// ```
#[macro_export]
macro_rules! exprasm {
    ($( $tt:tt )+) => {{ #[allow(unused_imports)] {
        use $crate::isa::{ContextOperand, Instr, MemoryOperand, SelectLte, TierRange};
        use $crate::data::{TierLogic, TierMode};
        let mut code: Vec<Instr> = vec![];
        $crate::exprasm_inner! { code => $( $tt )+ }
        code
    } }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! exprasm_inner {
    // end of program
    { $code:ident => } => { };
    // no operands
    { $code:ident => $op:ident ; $($tt:tt)* } => {
        $code.push($crate::instr!{ $op });
        $crate::exprasm_inner! { $code => $( $tt )* }
    };
    // operands are all literals
    { $code:ident => $op:ident $( $arg:literal ),+ ; $($tt:tt)* } => {
        $code.push($crate::instr!{ $op $( $arg ),+ });
        $crate::exprasm_inner! { $code => $( $tt )* }
    };
    // memory region followed by index
    { $code:ident => $op:ident $ty:ident $arg:literal ; $($tt:tt)* } => {
        $code.push($crate::instr!{ $op $ty $arg });
        $crate::exprasm_inner! { $code => $( $tt )* }
    };
    // tier logic and mode followed by length
    { $code:ident => $op:ident $logic:ident $mode:ident $arg:literal ; $($tt:tt)* } => {
        $code.push($crate::instr!{ $op $logic $mode $arg });
        $crate::exprasm_inner! { $code => $( $tt )* }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! instr {
    (@logic every) => { TierLogic::Every };
    (@logic any) => { TierLogic::Any };
    (@mode min) => { TierMode::Min };
    (@mode max) => { TierMode::Max };
    (@mode first) => { TierMode::First };

    (read $ty:ident $idx:literal) => {{
        const OPERAND: MemoryOperand = match MemoryOperand::$ty($idx) {
            Some(operand) => operand,
            None => panic!("memory index must not exceed 0x7FFF"),
        };
        Instr::Read(OPERAND)
    }};
    (context $col:literal, $row:literal) => { Instr::Context(ContextOperand::new($col, $row)) };
    (ctxrow $col:literal) => { Instr::CtxRow($col) };
    (ensure $n:literal) => { Instr::Ensure($n) };

    (add $n:literal) => { Instr::Add($n) };
    (sub $n:literal) => { Instr::Sub($n) };
    (mul $n:literal) => { Instr::Mul($n) };
    (div $n:literal) => { Instr::Div($n) };
    (rem $n:literal) => { Instr::Rem($n) };
    (exp $n:literal) => { Instr::Exp($n) };
    (min $n:literal) => { Instr::Min($n) };
    (max $n:literal) => { Instr::Max($n) };
    (adds $n:literal) => { Instr::AddSat($n) };
    (subs $n:literal) => { Instr::SubSat($n) };
    (muls $n:literal) => { Instr::MulSat($n) };

    (iszero) => { Instr::IsZero };
    (eq) => { Instr::Eq };
    (lt) => { Instr::Lt };
    (gt) => { Instr::Gt };
    (eif) => { Instr::Eif };
    (any $n:literal) => { Instr::Any($n) };
    (every $n:literal) => { Instr::Every($n) };

    (scale18 $d:literal) => { Instr::Scale18($d) };
    (scalen $d:literal) => { Instr::ScaleN($d) };
    (scaleby $s:literal) => { Instr::ScaleBy($s) };
    (mul18 $d:literal) => { Instr::Mul18($d) };
    (div18 $d:literal) => { Instr::Div18($d) };

    (get) => { Instr::Get };
    (set) => { Instr::Set };
    (hash $n:literal) => { Instr::Hash($n) };
    (explode) => { Instr::Explode };

    (tierat $tier:literal) => { Instr::TierAt($tier) };
    (tierupd $start:literal, $end:literal) => {{
        const RANGE: TierRange = match TierRange::new($start, $end) {
            Some(range) => range,
            None => panic!("tier range must satisfy start <= end <= 8"),
        };
        Instr::TierUpd(RANGE)
    }};
    (tierdiff) => { Instr::TierDiff };
    (selectlte $logic:ident $mode:ident $n:literal) => {
        Instr::SelectLte(SelectLte::new($crate::instr!(@logic $logic), $crate::instr!(@mode $mode), $n))
    };
}
