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

#![allow(missing_docs)]

// Memory and context access
pub const INSTR_READ: u16 = 0;
pub const INSTR_CONTEXT: u16 = 1;
pub const INSTR_CTXROW: u16 = 2;
pub const INSTR_ENSURE: u16 = 3;

// Checked (or wrapping) arithmetic folds
pub const INSTR_ADD: u16 = 4;
pub const INSTR_SUB: u16 = 5;
pub const INSTR_MUL: u16 = 6;
pub const INSTR_DIV: u16 = 7;
pub const INSTR_REM: u16 = 8;
pub const INSTR_EXP: u16 = 9;
pub const INSTR_MIN: u16 = 10;
pub const INSTR_MAX: u16 = 11;

// Saturating arithmetic folds
pub const INSTR_ADDS: u16 = 12;
pub const INSTR_SUBS: u16 = 13;
pub const INSTR_MULS: u16 = 14;

// Logic
pub const INSTR_ISZERO: u16 = 15;
pub const INSTR_EQ: u16 = 16;
pub const INSTR_LT: u16 = 17;
pub const INSTR_GT: u16 = 18;
pub const INSTR_EIF: u16 = 19;
pub const INSTR_ANY: u16 = 20;
pub const INSTR_EVERY: u16 = 21;

// Fixed-point decimals
pub const INSTR_SCALE18: u16 = 22;
pub const INSTR_SCALEN: u16 = 23;
pub const INSTR_SCALEBY: u16 = 24;
pub const INSTR_MUL18: u16 = 25;
pub const INSTR_DIV18: u16 = 26;

// Scratch key-value state
pub const INSTR_GET: u16 = 27;
pub const INSTR_SET: u16 = 28;

// Hashing and words
pub const INSTR_HASH: u16 = 29;
pub const INSTR_EXPLODE: u16 = 30;

// Tier reports
pub const INSTR_TIERAT: u16 = 31;
pub const INSTR_TIERUPD: u16 = 32;
pub const INSTR_TIERDIFF: u16 = 33;
pub const INSTR_SELECTLTE: u16 = 34;

/// Number of defined opcodes; opcodes at and above are reserved.
pub const INSTR_COUNT: u16 = 35;
