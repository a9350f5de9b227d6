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

//! Vault balances and the transactional overlay staging their changes.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use amplify::num::u256;

use crate::data::MathError;
use crate::Address;

/// Vault identity: a balance of a single token owned by an account under a numeric id.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct VaultKey {
    pub owner: Address,
    pub token: Address,
    pub vault_id: u256,
}

impl VaultKey {
    #[inline]
    pub fn new(owner: Address, token: Address, vault_id: u256) -> Self {
        VaultKey {
            owner,
            token,
            vault_id,
        }
    }
}

/// Committed vault balances. Absent vaults have zero balance.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Vaults(BTreeMap<VaultKey, u256>);

impl Vaults {
    #[inline]
    pub fn new() -> Self { Vaults::default() }

    #[inline]
    pub fn balance(&self, key: &VaultKey) -> u256 { self.0.get(key).copied().unwrap_or(u256::ZERO) }

    /// Applies balances staged by a [`VaultOverlay`].
    pub fn commit(&mut self, writes: Vec<(VaultKey, u256)>) {
        for (key, balance) in writes {
            if balance == u256::ZERO {
                self.0.remove(&key);
            } else {
                self.0.insert(key, balance);
            }
        }
    }
}

/// Write-through overlay on top of committed [`Vaults`].
///
/// Reads fall back to the base for vaults not written yet. Staged balances are applied with
/// [`Vaults::commit`] or dropped together with the overlay.
#[derive(Debug)]
pub struct VaultOverlay<'a> {
    base: &'a Vaults,
    writes: BTreeMap<VaultKey, u256>,
}

impl<'a> VaultOverlay<'a> {
    pub fn new(base: &'a Vaults) -> Self {
        VaultOverlay {
            base,
            writes: BTreeMap::new(),
        }
    }

    pub fn balance(&self, key: &VaultKey) -> u256 {
        match self.writes.get(key) {
            Some(balance) => *balance,
            None => self.base.balance(key),
        }
    }

    pub fn credit(&mut self, key: VaultKey, amount: u256) -> Result<u256, MathError> {
        let balance = self.balance(&key).checked_add(amount).ok_or(MathError::Overflow)?;
        self.writes.insert(key, balance);
        Ok(balance)
    }

    pub fn debit(&mut self, key: VaultKey, amount: u256) -> Result<u256, MathError> {
        let balance = self.balance(&key).checked_sub(amount).ok_or(MathError::Underflow)?;
        self.writes.insert(key, balance);
        Ok(balance)
    }

    /// Consumes the overlay and returns the staged balances.
    pub fn into_writes(self) -> Vec<(VaultKey, u256)> { self.writes.into_iter().collect() }
}

#[cfg(test)]
mod test {
    use super::*;

    fn key(owner: u8) -> VaultKey {
        VaultKey::new(Address::from_byte_array([owner; 20]), Address::from_byte_array([0xAA; 20]), u256::ONE)
    }

    #[test]
    fn overlay_reads_through() {
        let mut vaults = Vaults::new();
        vaults.commit(vec![(key(1), u256::from(10u64))]);
        let mut overlay = VaultOverlay::new(&vaults);
        assert_eq!(overlay.balance(&key(1)), u256::from(10u64));
        assert_eq!(overlay.balance(&key(2)), u256::ZERO);
        assert_eq!(overlay.debit(key(1), u256::from(4u64)), Ok(u256::from(6u64)));
        assert_eq!(overlay.balance(&key(1)), u256::from(6u64));
        assert_eq!(vaults.balance(&key(1)), u256::from(10u64));
    }

    #[test]
    fn overlay_checks_balances() {
        let vaults = Vaults::new();
        let mut overlay = VaultOverlay::new(&vaults);
        assert_eq!(overlay.debit(key(1), u256::ONE), Err(MathError::Underflow));
        overlay.credit(key(1), u256::MAX).unwrap();
        assert_eq!(overlay.credit(key(1), u256::ONE), Err(MathError::Overflow));
    }

    #[test]
    fn commit_drops_empty() {
        let mut vaults = Vaults::new();
        let mut overlay = VaultOverlay::new(&vaults);
        overlay.credit(key(1), u256::from(5u64)).unwrap();
        overlay.credit(key(2), u256::from(5u64)).unwrap();
        overlay.debit(key(2), u256::from(5u64)).unwrap();
        let writes = overlay.into_writes();
        vaults.commit(writes);
        assert_eq!(vaults.0.len(), 1);
        assert_eq!(vaults.balance(&key(1)), u256::from(5u64));
    }
}
