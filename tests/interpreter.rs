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

use amplify::num::u256;
use exprvm::core::{ArithmeticMode, Fault};
use exprvm::data::tier::NEVER;
use exprvm::evaluable::{assemble, IntegrityError, StackHeights};
use exprvm::isa::{Instr, OperandError};
use exprvm::{
    exprasm, Context, CoreConfig, Dispatch, EvalError, EvalOutcome, Evaluable, EvaluableConfig,
    Interpreter, StateKv,
};

fn w(val: u64) -> u256 { u256::from(val) }

fn evaluable(sources: &[&[Instr]], constants: &[u256]) -> Evaluable {
    Evaluable::new(EvaluableConfig {
        sources: sources.iter().map(|code| assemble(code.iter()).unwrap()).collect(),
        constants: constants.to_vec(),
    })
    .unwrap()
}

fn run(code: Vec<Instr>, constants: &[u256], context: &Context) -> Result<EvalOutcome, EvalError> {
    let evaluable = evaluable(&[&code], constants);
    let res = Interpreter::new().eval(&evaluable, Dispatch::new(0, u16::MAX), context);
    println!("\n{evaluable}\nOutcome: {res:#?}");
    res
}

fn fault(res: Result<EvalOutcome, EvalError>) -> Fault {
    match res {
        Err(EvalError::Fault { fault, .. }) => fault,
        other => panic!("evaluation has not faulted: {other:?}"),
    }
}

#[test]
fn arithmetic() {
    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        read    constant 2;
        add     3;
        read    constant 1;
        mul     2;
        read    constant 2;
        sub     2;
        read    constant 1;
        div     2;
    };
    // ((1 + 2 + 3) * 2 - 3) / 2
    let outcome = run(code, &[w(1), w(2), w(3)], &Context::empty()).unwrap();
    assert_eq!(outcome.stack, vec![w(4)]);
}

#[test]
fn checked_overflow() {
    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        add     2;
    };
    assert_eq!(fault(run(code, &[u256::MAX, w(1)], &Context::empty())), Fault::Overflow);

    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        sub     2;
    };
    assert_eq!(fault(run(code, &[w(1), w(2)], &Context::empty())), Fault::Underflow);

    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        exp     2;
    };
    assert_eq!(fault(run(code, &[w(2), w(256)], &Context::empty())), Fault::Overflow);

    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        div     2;
    };
    assert_eq!(fault(run(code, &[w(2), w(0)], &Context::empty())), Fault::DivisionByZero);
}

#[test]
fn unchecked_overflow() {
    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        add     2;
        read    constant 2;
        read    constant 1;
        sub     2;
        read    constant 3;
        read    constant 4;
        exp     2;
    };
    let evaluable = evaluable(&[&code], &[u256::MAX, w(2), w(0), w(2), w(256)]);
    let interpreter = Interpreter::with(CoreConfig {
        arithmetic: ArithmeticMode::Wrapping,
        complexity_lim: None,
    });
    let outcome = interpreter
        .eval(&evaluable, Dispatch::new(0, 3), &Context::empty())
        .unwrap();
    assert_eq!(outcome.stack, vec![w(1), u256::MAX.wrapping_sub(w(1)), w(0)]);
}

#[test]
fn saturating() {
    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        adds    2;
        read    constant 1;
        read    constant 0;
        subs    2;
        read    constant 0;
        read    constant 0;
        muls    2;
    };
    let outcome = run(code, &[u256::MAX, w(1)], &Context::empty()).unwrap();
    assert_eq!(outcome.stack, vec![u256::MAX, w(0), u256::MAX]);
}

#[test]
fn logic() {
    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        lt;
        read    constant 0;
        read    constant 1;
        gt;
        read    constant 1;
        read    constant 1;
        eq;
        read    constant 0;
        iszero;
        read    constant 2;
        read    constant 0;
        read    constant 1;
        eif;
        read    constant 0;
        read    constant 1;
        any     2;
        read    constant 0;
        read    constant 1;
        every   2;
        read    constant 1;
        read    constant 2;
        every   2;
    };
    let outcome = run(code, &[w(0), w(5), w(9)], &Context::empty()).unwrap();
    assert_eq!(outcome.stack, vec![w(1), w(0), w(1), w(1), w(0), w(5), w(0), w(5)]);
}

#[test]
fn ensure() {
    let code = exprasm! {
        read    constant 0;
        read    constant 0;
        ensure  2;
        read    constant 0;
    };
    assert_eq!(run(code, &[w(1)], &Context::empty()).unwrap().stack, vec![w(1)]);

    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        ensure  2;
    };
    assert_eq!(fault(run(code, &[w(1), w(0)], &Context::empty())), Fault::EnsureFailed(1));
}

#[test]
fn context_bounds() {
    let mut columns = vec![vec![]; 16];
    columns[15] = (0..256u64).map(w).collect();
    let context = Context::new(columns).unwrap();

    let code = exprasm! {
        context 15, 255;
        context 15, 0;
    };
    let outcome = run(code, &[], &context).unwrap();
    assert_eq!(outcome.stack, vec![w(255), w(0)]);

    let code = exprasm! {
        context 14, 0;
    };
    assert_eq!(fault(run(code, &[], &context)), Fault::ContextOutOfBounds(14, 0));

    let code = exprasm! {
        context 15, 255;
    };
    assert_eq!(fault(run(code, &[], &Context::empty())), Fault::ContextOutOfBounds(15, 255));

    assert!(Context::new(vec![vec![]; 17]).is_err());
    assert!(Context::new(vec![vec![w(0); 257]]).is_err());
}

#[test]
fn context_row() {
    let context = Context::new(vec![vec![w(10), w(20), w(30)]]).unwrap();
    let code = exprasm! {
        read    constant 0;
        ctxrow  0;
        read    constant 1;
        ctxrow  0;
    };
    let outcome = run(code.clone(), &[w(2), w(0)], &context).unwrap();
    assert_eq!(outcome.stack, vec![w(30), w(10)]);
    assert_eq!(fault(run(code, &[w(3), w(0)], &context)), Fault::ContextOutOfBounds(0, 3));
}

#[test]
fn context_column_integrity() {
    let code = exprasm! {
        context 16, 0;
    };
    let res = Evaluable::new(EvaluableConfig {
        sources: vec![assemble(&code).unwrap()],
        constants: vec![],
    });
    assert!(matches!(
        res,
        Err(IntegrityError::Operand(0, 0, _, OperandError::ContextColumnOutOfRange(16)))
    ));
}

#[test]
fn state_across_phases() {
    let calculate = exprasm! {
        read    constant 0;
        read    constant 1;
        set;
        read    constant 2;
        get;
    };
    let handle = exprasm! {
        read    constant 0;
        get;
        read    constant 2;
        get;
    };
    let evaluable = evaluable(&[&calculate, &handle], &[w(1), w(7), w(99)]);
    let interpreter = Interpreter::new();
    let context = Context::empty();

    let first = interpreter.eval(&evaluable, Dispatch::new(0, 1), &context).unwrap();
    assert_eq!(first.stack, vec![w(0)]);
    assert_eq!(first.state.get(w(1)), w(7));

    let second = interpreter
        .eval_with_state(&evaluable, Dispatch::new(1, 2), &context, first.state)
        .unwrap();
    assert_eq!(second.stack, vec![w(7), w(0)]);

    let fresh = interpreter.eval(&evaluable, Dispatch::new(1, 2), &context).unwrap();
    assert_eq!(fresh.stack, vec![w(0), w(0)]);
}

#[test]
fn last_write_wins() {
    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        set;
        read    constant 0;
        read    constant 2;
        set;
        read    constant 0;
        get;
    };
    let mut state = StateKv::new();
    state.set(w(5), w(5));
    let evaluable = evaluable(&[&code], &[w(1), w(2), w(3)]);
    let outcome = Interpreter::new()
        .eval_with_state(&evaluable, Dispatch::new(0, 1), &Context::empty(), state)
        .unwrap();
    assert_eq!(outcome.stack_top(), Some(w(3)));
    assert_eq!(outcome.state.get(w(5)), w(5));
    assert_eq!(outcome.state.len(), 2);
}

#[test]
fn fixed_point() {
    let code = exprasm! {
        read    constant 0;
        scale18 6;
        read    constant 1;
        scalen  6;
        read    constant 0;
        read    constant 2;
        mul18   6;
        read    constant 0;
        read    constant 2;
        div18   6;
        read    constant 0;
        scaleby -3;
    };
    // 1.5 with 6 decimals, 1.5 with 18 decimals, 2.0 with 18 decimals
    let one_and_half = w(1_500_000_000_000_000_000);
    let outcome = run(code, &[w(1_500_000), one_and_half, w(2_000_000_000_000_000_000)], &Context::empty())
        .unwrap();
    assert_eq!(outcome.stack, vec![
        one_and_half,
        w(1_500_000),
        w(3_000_000_000_000_000_000),
        w(750_000_000_000_000_000),
        w(1_500),
    ]);
}

#[test]
fn tiers() {
    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        tierupd 0, 3;
        read    stack 0;
        tierat  3;
        read    stack 0;
        tierat  4;
        read    stack 0;
        tierat  0;
    };
    let outcome = run(code, &[NEVER, w(100)], &Context::empty()).unwrap();
    assert_eq!(outcome.stack[1..], [w(100), w(u32::MAX as u64), w(0)]);

    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        tierupd 0, 8;
        read    constant 0;
        read    constant 2;
        tierupd 0, 8;
        read    constant 3;
        selectlte any min 2;
        tierat  1;
    };
    let outcome = run(code, &[NEVER, w(50), w(20), w(30)], &Context::empty()).unwrap();
    assert_eq!(outcome.stack, vec![w(20)]);
}

#[test]
fn explode_and_hash() {
    let code = exprasm! {
        read    constant 0;
        explode;
    };
    let word = u256::from_le_bytes({
        let mut buf = [0u8; 32];
        buf[0] = 1;
        buf[4] = 2;
        buf[28] = 8;
        buf
    });
    let outcome = run(code, &[word], &Context::empty()).unwrap();
    assert_eq!(outcome.stack, vec![w(1), w(2), w(0), w(0), w(0), w(0), w(0), w(8)]);

    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        hash    2;
    };
    let outcome = run(code, &[w(1), w(2)], &Context::empty()).unwrap();
    let expected = u256::from_be_bytes(exprvm::core::message_hash(&[w(1), w(2)]));
    assert_eq!(outcome.stack_top(), Some(expected));
}

#[test]
fn stack_reads() {
    let code = exprasm! {
        read    constant 0;
        read    constant 1;
        read    stack 0;
        read    stack 2;
    };
    let outcome = run(code, &[w(4), w(5)], &Context::empty()).unwrap();
    assert_eq!(outcome.stack, vec![w(4), w(5), w(4), w(4)]);

    let code = exprasm! {
        read    constant 0;
        read    stack 1;
    };
    let res = Evaluable::new(EvaluableConfig {
        sources: vec![assemble(&code).unwrap()],
        constants: vec![w(0)],
    });
    assert!(matches!(
        res,
        Err(IntegrityError::Operand(0, 4, _, OperandError::StackReadOutOfRange(1, 1)))
    ));
}

#[test]
fn integrity_is_exact() {
    let code = exprasm! {
        read    constant 0;
        read    constant 0;
        read    constant 0;
        add     3;
        explode;
        max     8;
        read    constant 0;
        read    constant 0;
        set;
    };
    let evaluable = evaluable(&[&code], &[w(1)]);
    assert_eq!(evaluable.stack_heights(0), Some(StackHeights { max: 8, end: 1 }));
    // the allocated stack is never exceeded
    let outcome = Interpreter::new()
        .eval(&evaluable, Dispatch::new(0, 1), &Context::empty())
        .unwrap();
    assert_eq!(outcome.stack, vec![w(3)]);
}

#[test]
fn integrity_rejects_underflow() {
    let code = exprasm! {
        read    constant 0;
        add     2;
    };
    let res = Evaluable::new(EvaluableConfig {
        sources: vec![assemble(&code).unwrap()],
        constants: vec![w(0)],
    });
    assert!(matches!(res, Err(IntegrityError::StackUnderflow(0, 4, _))));

    let code = exprasm! {
        read    constant 3;
    };
    let res = Evaluable::new(EvaluableConfig {
        sources: vec![assemble(&code).unwrap()],
        constants: vec![w(0)],
    });
    assert!(matches!(
        res,
        Err(IntegrityError::Operand(0, 0, _, OperandError::ConstantOutOfRange(3, 1)))
    ));
}
