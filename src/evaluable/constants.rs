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

//! Limits of evaluable programs

#![allow(missing_docs)]

/// Maximal number of sources in a single evaluable.
pub const SOURCES_MAX_COUNT: usize = 0xFF;

/// Maximal length of a single source bytecode, in bytes.
pub const SOURCE_MAX_LEN: usize = 0xFFFF;

/// Maximal number of constants in the constants pool.
pub const CONSTANTS_MAX_COUNT: usize = 0xFFFF;

pub const EVALUABLE_ID_TAG: &str = "urn:exprvm:evaluable:v01";

pub const ORDER_HASH_TAG: &str = "urn:exprvm:order:v01";
