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

//! Word-level data arithmetic: fixed-point decimals and tier reports.

mod fixed;
pub mod tier;

use amplify::num::u256;

pub use self::fixed::{
    checked_pow, fixed_point_div, fixed_point_mul, fp_one, mul_div, pow10, scale18, scale_by,
    scale_n, scale_n_saturating, scale_ratio, wrapping_pow, MathError, FP_DECIMALS, POW10_MAX,
};
pub use self::tier::{TierLogic, TierMode};

/// Converts boolean into a machine word (`1` or `0`).
#[inline]
pub fn word_from_bool(val: bool) -> u256 {
    if val {
        u256::ONE
    } else {
        u256::ZERO
    }
}

/// Returns word value if it fits into 64 bits.
pub fn word_to_u64(word: u256) -> Option<u64> {
    let bytes = word.to_le_bytes();
    if bytes[8..].iter().any(|byte| *byte != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    Some(u64::from_le_bytes(buf))
}

/// Returns word value if it fits into 32 bits.
#[inline]
pub fn word_to_u32(word: u256) -> Option<u32> { word_to_u64(word).and_then(|val| u32::try_from(val).ok()) }

/// Serializes sequence of words into concatenation of their big-endian representations.
pub fn words_to_be_bytes(words: &[u256]) -> alloc::vec::Vec<u8> {
    words.iter().flat_map(|word| word.to_be_bytes()).collect()
}
