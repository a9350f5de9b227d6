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

use alloc::collections::BTreeMap;

use amplify::num::u256;

/// Scratch key-value state of an evaluation.
///
/// Lives for a single logical call and may be carried between evaluation phases within it. Keys
/// which were never set read as zero.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct StateKv(BTreeMap<u256, u256>);

impl StateKv {
    #[inline]
    pub fn new() -> Self { StateKv::default() }

    /// Reads value under the `key`, returning zero if the key was never set.
    #[inline]
    pub fn get(&self, key: u256) -> u256 { self.0.get(&key).copied().unwrap_or(u256::ZERO) }

    /// Writes value under the `key`, returning the previous value, if any.
    #[inline]
    pub fn set(&mut self, key: u256, value: u256) -> Option<u256> { self.0.insert(key, value) }

    #[inline]
    pub fn len(&self) -> usize { self.0.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&u256, &u256)> { self.0.iter() }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_zero() {
        let mut state = StateKv::new();
        assert_eq!(state.get(u256::ONE), u256::ZERO);
        assert_eq!(state.set(u256::ONE, u256::from(5u64)), None);
        assert_eq!(state.set(u256::ONE, u256::from(6u64)), Some(u256::from(5u64)));
        assert_eq!(state.get(u256::ONE), u256::from(6u64));
        assert_eq!(state.len(), 1);
    }
}
