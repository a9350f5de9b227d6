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

//! Account addresses and content identifiers shared by the interpreter and the order book.

use core::fmt::{self, Debug, Display, Formatter};

use amplify::hex::ToHex;
use amplify::num::u256;
use amplify::{Bytes20, Bytes32};

/// Converts 32-byte big-endian hash into a machine word.
#[inline]
pub fn word_from_hash(hash: Bytes32) -> u256 { u256::from_be_bytes(hash.to_byte_array()) }

/// 20-byte account address (of a caller, a token or a contract).
#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default, From)]
#[wrapper(Deref, BorrowSlice, Index, RangeOps, LowerHex)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", transparent)
)]
pub struct Address(
    #[from]
    #[from([u8; 20])]
    Bytes20,
);

impl Address {
    /// Constructs address from a raw byte array.
    #[inline]
    pub fn from_byte_array(bytes: [u8; 20]) -> Self { Address(Bytes20::from_byte_array(bytes)) }

    /// Returns raw address bytes.
    #[inline]
    pub fn to_byte_array(&self) -> [u8; 20] { self.0.to_byte_array() }

    /// Represents address as a machine word, right-aligned in big-endian order.
    pub fn to_word(&self) -> u256 {
        let mut buf = [0u8; 32];
        buf[12..].copy_from_slice(&self.to_byte_array());
        u256::from_be_bytes(buf)
    }

    /// Reads address from the lowest 20 bytes of a machine word, discarding higher bytes.
    pub fn from_word(word: u256) -> Self {
        let bytes = word.to_be_bytes();
        let mut buf = [0u8; 20];
        buf.copy_from_slice(&bytes[12..]);
        Address::from_byte_array(buf)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { write!(f, "0x{}", self.0.to_hex()) }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", self.0.to_hex())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn word_conversion() {
        let mut bytes = [0u8; 20];
        bytes[0] = 0xAB;
        bytes[19] = 0x01;
        let addr = Address::from_byte_array(bytes);
        let word = addr.to_word();
        assert_eq!(word.to_be_bytes()[12], 0xAB);
        assert_eq!(word.to_be_bytes()[31], 0x01);
        assert_eq!(Address::from_word(word), addr);
    }

    #[test]
    fn from_word_drops_high_bytes() {
        let word = u256::MAX;
        assert_eq!(Address::from_word(word), Address::from_byte_array([0xFF; 20]));
    }

    #[test]
    fn display() {
        let addr = Address::from_byte_array([0x0A; 20]);
        assert_eq!(format!("{addr}"), format!("0x{}", "0a".repeat(20)));
        assert_eq!(format!("{addr:x}"), "0a".repeat(20));
        assert_eq!(format!("{addr:?}"), format!("Address(0x{})", "0a".repeat(20)));
    }
}
