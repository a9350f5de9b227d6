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

//! Expression interpreter

use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use amplify::num::u256;

use crate::core::{Context, Core, CoreConfig, Fault, StateKv};
use crate::evaluable::{Evaluable, Marshaller};
use crate::isa::{Bytecode, BytecodeRead, EvalContext, ExecStep, Instr, InstructionSet};

/// Selector of the source to evaluate and the number of stack values to return.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Default, Display)]
#[display("{source}:{max_outputs}")]
pub struct Dispatch {
    /// Index of the source inside the evaluable.
    pub source: u16,
    /// Maximal number of values taken from the top of the final stack.
    pub max_outputs: u16,
}

impl Dispatch {
    #[inline]
    pub const fn new(source: u16, max_outputs: u16) -> Self { Dispatch { source, max_outputs } }

    /// Decodes dispatch from a `source << 16 | max_outputs` selector.
    #[inline]
    pub const fn from_u32(selector: u32) -> Self {
        Dispatch {
            source: (selector >> 16) as u16,
            max_outputs: selector as u16,
        }
    }

    #[inline]
    pub const fn to_u32(self) -> u32 { (self.source as u32) << 16 | self.max_outputs as u32 }
}

/// Errors aborting an evaluation.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Error)]
pub enum EvalError {
    /// Dispatch references a source absent in the evaluable.
    SourceAbsent(u16),

    /// Instruction at the given source offset has faulted.
    Fault { source: u16, pos: u16, fault: Fault },
}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::SourceAbsent(source) => write!(f, "evaluable has no source #{source}"),
            EvalError::Fault { source, pos, fault } => {
                write!(f, "evaluation of source #{source} aborted at offset {pos:#06X}: {fault}")
            }
        }
    }
}

/// Successful evaluation result.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct EvalOutcome {
    /// Top `max_outputs` values of the final stack, bottom first.
    pub stack: Vec<u256>,
    /// Scratch state after the evaluation.
    pub state: StateKv,
    /// Accumulated instruction complexity.
    pub complexity: u64,
}

impl EvalOutcome {
    /// Returns the topmost value of the returned stack.
    #[inline]
    pub fn stack_top(&self) -> Option<u256> { self.stack.last().copied() }
}

/// Interpreter running evaluable sources against a context.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Interpreter {
    config: CoreConfig,
}

impl Interpreter {
    /// Constructs interpreter with checked arithmetic and no complexity limit.
    #[inline]
    pub fn new() -> Self { Interpreter::default() }

    #[inline]
    pub fn with(config: CoreConfig) -> Self { Interpreter { config } }

    #[inline]
    pub fn config(&self) -> CoreConfig { self.config }

    /// Evaluates a source starting with an empty scratch state.
    #[inline]
    pub fn eval(
        &self,
        evaluable: &Evaluable,
        dispatch: Dispatch,
        context: &Context,
    ) -> Result<EvalOutcome, EvalError> {
        self.eval_with_state(evaluable, dispatch, context, StateKv::new())
    }

    /// Evaluates a source with a scratch state carried over from a previous evaluation phase.
    pub fn eval_with_state(
        &self,
        evaluable: &Evaluable,
        dispatch: Dispatch,
        context: &Context,
        state: StateKv,
    ) -> Result<EvalOutcome, EvalError> {
        #[cfg(feature = "log")]
        let (m, d, g, r, z) = ("\x1B[0;35m", "\x1B[0;37;2m", "\x1B[0;32m", "\x1B[0;31m", "\x1B[0m");

        let source = dispatch.source;
        let (Some(code), Some(heights)) = (evaluable.source(source), evaluable.stack_heights(source))
        else {
            return Err(EvalError::SourceAbsent(source));
        };
        let id = evaluable.id();
        tracing::debug!(%id, %dispatch, alloc = heights.max, "evaluation started");

        let mut core = Core::with(self.config, heights.max, state);
        let ctx = EvalContext {
            context,
            constants: evaluable.constants(),
        };
        let mut marshaller = Marshaller::with(code);

        while !marshaller.is_eof() {
            let pos = marshaller.pos();
            let fault = |fault: Fault| EvalError::Fault { source, pos, fault };

            let instr = Instr::decode_instr(&mut marshaller).map_err(|err| fault(err.into()))?;
            tracing::trace!(source, pos, %instr, height = core.height(), "executing");

            #[cfg(feature = "log")]
            eprint!("{m}#{source}@x{pos:04X}:{z} {: <24}; ", instr.to_string());

            if let ExecStep::Fail(err) = instr.exec(&mut core, &ctx) {
                #[cfg(feature = "log")]
                eprintln!("{r}failed{z}: {err}");
                tracing::debug!(%id, source, pos, %err, "evaluation aborted");
                return Err(fault(err));
            }

            #[cfg(feature = "log")]
            {
                eprint!("{d}->{z} ");
                for val in core.stack() {
                    eprint!("{g}{val:?}{z}, ");
                }
                eprintln!();
            }

            if !core.acc_complexity(instr.complexity()) {
                #[cfg(feature = "log")]
                eprintln!("{r}complexity overflow{z}");
                tracing::debug!(%id, source, pos, ca = core.ca(), "complexity limit exceeded");
                return Err(fault(Fault::ComplexityExceeded));
            }
        }

        let (mut stack, state, complexity) = core.into_parts();
        let keep = stack.len().min(dispatch.max_outputs as usize);
        let stack = stack.split_off(stack.len() - keep);
        tracing::debug!(%id, source, outputs = stack.len(), complexity, "evaluation finished");
        Ok(EvalOutcome {
            stack,
            state,
            complexity,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::evaluable::{assemble, EvaluableConfig};
    use crate::isa::{ContextOperand, MemoryOperand};

    fn evaluable(sources: &[&[Instr]], constants: &[u64]) -> Evaluable {
        Evaluable::new(EvaluableConfig {
            sources: sources.iter().map(|code| assemble(code.iter()).unwrap()).collect(),
            constants: constants.iter().copied().map(u256::from).collect(),
        })
        .unwrap()
    }

    #[test]
    fn dispatch_selector() {
        let dispatch = Dispatch::new(3, 2);
        assert_eq!(dispatch.to_u32(), 0x0003_0002);
        assert_eq!(Dispatch::from_u32(0x0003_0002), dispatch);
        assert_eq!(dispatch.to_string(), "3:2");
    }

    #[test]
    fn outputs_are_stack_tail() {
        let code = [
            Instr::Read(MemoryOperand::constant(0).unwrap()),
            Instr::Read(MemoryOperand::constant(1).unwrap()),
            Instr::Read(MemoryOperand::constant(2).unwrap()),
        ];
        let evaluable = evaluable(&[&code], &[1, 2, 3]);
        let interpreter = Interpreter::new();
        let context = Context::empty();

        let outcome = interpreter.eval(&evaluable, Dispatch::new(0, 2), &context).unwrap();
        assert_eq!(outcome.stack, vec![u256::from(2u64), u256::from(3u64)]);
        assert_eq!(outcome.stack_top(), Some(u256::from(3u64)));
        assert_eq!(outcome.complexity, 3);

        let outcome = interpreter.eval(&evaluable, Dispatch::new(0, 10), &context).unwrap();
        assert_eq!(outcome.stack.len(), 3);

        let outcome = interpreter.eval(&evaluable, Dispatch::new(0, 0), &context).unwrap();
        assert!(outcome.stack.is_empty());
        assert_eq!(outcome.stack_top(), None);
    }

    #[test]
    fn absent_source() {
        let evaluable = evaluable(&[&[]], &[]);
        assert_eq!(
            Interpreter::new().eval(&evaluable, Dispatch::new(1, 1), &Context::empty()),
            Err(EvalError::SourceAbsent(1))
        );
    }

    #[test]
    fn fault_position() {
        let code = [
            Instr::Read(MemoryOperand::constant(0).unwrap()),
            Instr::Read(MemoryOperand::constant(0).unwrap()),
            Instr::Context(ContextOperand::new(0, 0)),
        ];
        let evaluable = evaluable(&[&code], &[1]);
        assert_eq!(
            Interpreter::new().eval(&evaluable, Dispatch::new(0, 1), &Context::empty()),
            Err(EvalError::Fault {
                source: 0,
                pos: 8,
                fault: Fault::ContextOutOfBounds(0, 0)
            })
        );
    }

    #[test]
    fn complexity_limit() {
        let code = [
            Instr::Read(MemoryOperand::constant(0).unwrap()),
            Instr::Read(MemoryOperand::constant(0).unwrap()),
            Instr::Exp(2),
        ];
        let evaluable = evaluable(&[&code], &[2]);
        let limited = Interpreter::with(CoreConfig {
            complexity_lim: Some(5),
            ..default!()
        });
        assert_eq!(
            limited.eval(&evaluable, Dispatch::new(0, 1), &Context::empty()),
            Err(EvalError::Fault {
                source: 0,
                pos: 8,
                fault: Fault::ComplexityExceeded
            })
        );
        let outcome = Interpreter::new().eval(&evaluable, Dispatch::new(0, 1), &Context::empty()).unwrap();
        assert_eq!(outcome.complexity, 10);
        assert_eq!(outcome.stack_top(), Some(u256::from(4u64)));
    }
}
