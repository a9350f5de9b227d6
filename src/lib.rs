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

//! **ExprVM** is a deterministic sandboxed expression virtual machine with a stack-based
//! instruction set, and an order-matching engine built on top of it.
//!
//! Expressions are linear sequences of fixed-width 4-byte instructions ("sources") sharing a pool
//! of 256-bit constants. An [`Evaluable`] is validated once at construction by a static stack
//! simulation, which computes the exact stack allocation for each source and rejects any source
//! which may underflow the stack or reference absent constants. The [`Interpreter`] evaluates a
//! source against a read-only [`Context`] matrix, returning the top of the operand stack and the
//! scratch key-value state. There are no jumps and no loops, so evaluation always terminates.
//!
//! The [`orderbook`] module uses expressions as pricing logic of orders: each order computes its
//! maximal output and exchange ratio, and may validate the realized trade afterwards. Orders are
//! taken directly or cleared against each other, with all vault changes applied atomically.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[macro_use]
extern crate amplify;

#[cfg(feature = "serde")]
#[macro_use]
extern crate serde_crate as serde;

mod types;
pub mod data;
#[macro_use]
pub mod isa;
pub mod core;
pub mod evaluable;
mod vm;
pub mod orderbook;

pub use self::core::{Context, ContextBuilder, CoreConfig, SignatureVerifier, SignedContext, StateKv};
pub use evaluable::{Evaluable, EvaluableConfig, EvaluableId};
pub use isa::Instr;
pub use orderbook::OrderBook;
pub use types::{word_from_hash, Address};
pub use vm::{Dispatch, EvalError, EvalOutcome, Interpreter};
