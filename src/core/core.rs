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

use alloc::vec::Vec;
use core::fmt::{self, Debug, Formatter};

use amplify::num::u256;

use super::{Fault, StateKv};

/// Overflow semantic of `add`, `sub`, `mul` and `exp` instructions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, Default)]
pub enum ArithmeticMode {
    /// Overflow and underflow abort the evaluation.
    #[default]
    #[display("checked")]
    Checked,

    /// Results are taken modulo `2^256`.
    #[display("wrapping")]
    Wrapping,
}

/// Configuration for [`Core`] initialization.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct CoreConfig {
    /// Arithmetic overflow semantic.
    pub arithmetic: ArithmeticMode,
    /// Initial value for the [`Core::cl`] complexity limit.
    pub complexity_lim: Option<u64>,
}

/// State of a single evaluation: operand stack, scratch state and complexity counters.
#[derive(Clone)]
pub struct Core {
    /// Operand stack, bottom first.
    stack: Vec<u256>,

    /// Stack height allocated for the evaluated source.
    alloc: u16,

    /// Scratch key-value state.
    state: StateKv,

    arithmetic: ArithmeticMode,

    /// Complexity accumulator / counter.
    ///
    /// Each instruction has associated computational complexity level. This counter sums
    /// complexity of executed instructions.
    ca: u64,

    /// Complexity limit.
    ///
    /// If this limit is set, once [`Core::ca`] will reach this value the VM will
    /// stop evaluation with [`Fault::ComplexityExceeded`].
    cl: Option<u64>,
}

impl Core {
    /// Initializes core with an empty stack of the given allocated height and an empty state.
    ///
    /// An alias for [`Core::with`]`(`[`CoreConfig::default()`]`, alloc, default!())`.
    #[inline]
    pub fn new(alloc: u16) -> Self { Core::with(default!(), alloc, default!()) }

    /// Initializes core using a configuration object [`CoreConfig`] and a scratch state carried
    /// over from previous evaluations.
    pub fn with(config: CoreConfig, alloc: u16, state: StateKv) -> Self {
        Core {
            stack: Vec::with_capacity(alloc as usize),
            alloc,
            state,
            arithmetic: config.arithmetic,
            ca: 0,
            cl: config.complexity_lim,
        }
    }

    /// Pushes value on top of the stack.
    pub fn push(&mut self, val: u256) -> Result<(), Fault> {
        if self.stack.len() >= self.alloc as usize {
            return Err(Fault::StackOverflow(self.alloc));
        }
        self.stack.push(val);
        Ok(())
    }

    /// Pops value from the top of the stack.
    #[inline]
    pub fn pop(&mut self) -> Result<u256, Fault> { self.stack.pop().ok_or(Fault::StackUnderflow) }

    /// Pops `n` values from the top of the stack, returning them bottom first.
    pub fn pop_many(&mut self, n: u16) -> Result<Vec<u256>, Fault> {
        let height = self.stack.len();
        if (n as usize) > height {
            return Err(Fault::StackUnderflow);
        }
        Ok(self.stack.split_off(height - n as usize))
    }

    /// Reads stack item counting from the bottom of the stack.
    pub fn read(&self, index: u16) -> Result<u256, Fault> {
        self.stack
            .get(index as usize)
            .copied()
            .ok_or(Fault::StackReadOutOfBounds(index, self.height()))
    }

    /// Current stack height.
    #[inline]
    pub fn height(&self) -> u16 { self.stack.len() as u16 }

    /// Stack height allocated for the evaluation.
    #[inline]
    pub fn alloc(&self) -> u16 { self.alloc }

    #[inline]
    pub fn stack(&self) -> &[u256] { &self.stack }

    #[inline]
    pub fn state(&self) -> &StateKv { &self.state }

    #[inline]
    pub fn state_mut(&mut self) -> &mut StateKv { &mut self.state }

    #[inline]
    pub fn arithmetic(&self) -> ArithmeticMode { self.arithmetic }

    /// Return accumulated complexity.
    #[inline]
    pub fn ca(&self) -> u64 { self.ca }

    /// Return complexity limit value.
    #[inline]
    pub fn cl(&self) -> Option<u64> { self.cl }

    /// Accumulates complexity of the executed instruction.
    ///
    /// # Returns
    ///
    /// `false` if the complexity limit is reached.
    pub fn acc_complexity(&mut self, complexity: u64) -> bool {
        self.ca = self.ca.saturating_add(complexity);
        match self.cl {
            Some(lim) => self.ca <= lim,
            None => true,
        }
    }

    /// Decomposes core into its stack, scratch state and accumulated complexity.
    #[inline]
    pub fn into_parts(self) -> (Vec<u256>, StateKv, u64) { (self.stack, self.state, self.ca) }
}

impl Debug for Core {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (sect, reg, val, reset) =
            if f.alternate() { ("\x1B[0;4;1m", "\x1B[0;1m", "\x1B[0;32m", "\x1B[0m") } else { ("", "", "", "") };

        writeln!(f, "{sect}Counters:{reset}")?;
        write!(f, "{reg}ca{reset} {val}{}{reset}, ", self.ca)?;
        match self.cl {
            Some(cl) => write!(f, "{reg}cl{reset} {val}{cl}{reset}, ")?,
            None => write!(f, "{reg}cl{reset} {val}~{reset}, ")?,
        }
        writeln!(f, "{reg}mode{reset} {val}{}{reset}", self.arithmetic)?;

        writeln!(f, "{sect}Stack ({}/{}):{reset}", self.stack.len(), self.alloc)?;
        for (i, v) in self.stack.iter().enumerate() {
            writeln!(f, "{reg}[{i}]{reset} {val}{v:?}{reset}")?;
        }

        if !self.state.is_empty() {
            writeln!(f, "{sect}State:{reset}")?;
            for (k, v) in self.state.iter() {
                writeln!(f, "{reg}{k:?}{reset} => {val}{v:?}{reset}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stack_bounds() {
        let mut core = Core::new(2);
        assert_eq!(core.pop(), Err(Fault::StackUnderflow));
        core.push(u256::ONE).unwrap();
        core.push(u256::from(2u64)).unwrap();
        assert_eq!(core.push(u256::ONE), Err(Fault::StackOverflow(2)));
        assert_eq!(core.read(1), Ok(u256::from(2u64)));
        assert_eq!(core.read(2), Err(Fault::StackReadOutOfBounds(2, 2)));
        assert_eq!(core.pop_many(3), Err(Fault::StackUnderflow));
        assert_eq!(core.pop_many(2), Ok(vec![u256::ONE, u256::from(2u64)]));
        assert_eq!(core.height(), 0);
    }

    #[test]
    fn complexity_limit() {
        let mut core = Core::with(
            CoreConfig {
                complexity_lim: Some(3),
                ..default!()
            },
            0,
            default!(),
        );
        assert!(core.acc_complexity(2));
        assert!(core.acc_complexity(1));
        assert!(!core.acc_complexity(1));
        assert_eq!(core.ca(), 4);
    }

    #[test]
    fn debug_dump() {
        let mut core = Core::new(1);
        core.push(u256::from(0xABu64)).unwrap();
        let dump = format!("{core:?}");
        assert!(dump.contains("Stack (1/1)"));
        assert!(dump.contains("[0]"));
    }
}
