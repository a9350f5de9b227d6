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

use crate::data::MathError;
use crate::isa::DecodeError;

/// Reasons for aborting an evaluation.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum Fault {
    /// push beyond the allocated stack height of {0}.
    StackOverflow(u16),

    /// pop from an empty stack.
    StackUnderflow,

    /// read of stack item {0} while the stack height is {1}.
    StackReadOutOfBounds(u16, u16),

    /// reference to absent constant #{0}.
    ConstantOutOfBounds(u16),

    /// access to context cell at column {0}, row {1} which is out of bounds.
    ContextOutOfBounds(u8, u64),

    /// arithmetic overflow.
    Overflow,

    /// arithmetic underflow.
    Underflow,

    /// division by zero.
    DivisionByZero,

    /// ensure failed: value #{0} of the checked values is zero.
    EnsureFailed(u16),

    /// complexity limit exceeded.
    ComplexityExceeded,

    /// invalid bytecode: {0}
    #[from]
    Decode(DecodeError),
}

impl From<MathError> for Fault {
    fn from(err: MathError) -> Self {
        match err {
            MathError::Overflow => Fault::Overflow,
            MathError::Underflow => Fault::Underflow,
            MathError::DivisionByZero => Fault::DivisionByZero,
        }
    }
}
