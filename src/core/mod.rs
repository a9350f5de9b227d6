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

//! Evaluation core: operand stack, scratch state, faults and the context matrix.

mod context;
#[allow(clippy::module_inception)]
mod core;
mod fault;
mod state;

#[cfg(feature = "secp256k1")]
pub use self::context::Secp256k1Verifier;
pub use self::context::{
    message_hash, Context, ContextBuilder, ContextError, SignatureVerifier, SignedContext,
    CONTEXT_BASE_COLUMN, CONTEXT_COLUMNS_MAX, CONTEXT_ROWS_MAX,
};
pub use self::core::{ArithmeticMode, Core, CoreConfig};
pub use self::fault::Fault;
pub use self::state::StateKv;
