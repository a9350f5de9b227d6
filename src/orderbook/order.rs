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

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::{self, Debug, Display, Formatter};

use amplify::hex::ToHex;
use amplify::num::u256;
use amplify::Bytes32;
use sha2::{Digest, Sha256};

use crate::evaluable::constants::ORDER_HASH_TAG;
use crate::evaluable::{Evaluable, EvaluableConfig};
use crate::types::word_from_hash;
use crate::Address;

/// Token vault an order may receive into or send from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct IO {
    pub token: Address,
    /// Number of decimals of the token amounts.
    pub decimals: u8,
    pub vault_id: u256,
}

/// Order parameters provided by its owner.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct OrderConfig {
    pub valid_inputs: Vec<IO>,
    pub valid_outputs: Vec<IO>,
    /// Source 0 computes `[outputMax, ioRatio]`; optional source 1 validates the realized trade.
    pub evaluable_config: EvaluableConfig,
    /// Opaque data stored with the order.
    pub data: Vec<u8>,
}

/// Live order in the order book.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Order {
    pub owner: Address,
    /// Whether the handle-IO source is present and gets evaluated after each trade.
    pub handle_io: bool,
    pub evaluable: Arc<Evaluable>,
    pub valid_inputs: Vec<IO>,
    pub valid_outputs: Vec<IO>,
    pub data: Vec<u8>,
}

impl Order {
    /// Content hash of the order, committing to all of its fields.
    pub fn hash(&self) -> OrderHash {
        let mut engine = Sha256::new();
        engine.update(ORDER_HASH_TAG.as_bytes());
        engine.update(self.owner.to_byte_array());
        engine.update([self.handle_io as u8]);
        engine.update(self.evaluable.id().to_byte_array());
        for ios in [&self.valid_inputs, &self.valid_outputs] {
            engine.update((ios.len() as u32).to_be_bytes());
            for io in ios {
                engine.update(io.token.to_byte_array());
                engine.update([io.decimals]);
                engine.update(io.vault_id.to_be_bytes());
            }
        }
        engine.update((self.data.len() as u32).to_be_bytes());
        engine.update(&self.data);
        let mut buf = [0u8; 32];
        buf.copy_from_slice(&engine.finalize());
        OrderHash::from(buf)
    }

    /// Returns valid input with the given index.
    #[inline]
    pub fn input(&self, index: usize) -> Option<&IO> { self.valid_inputs.get(index) }

    /// Returns valid output with the given index.
    #[inline]
    pub fn output(&self, index: usize) -> Option<&IO> { self.valid_outputs.get(index) }
}

/// Content hash identifying an [`Order`].
#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default, From)]
#[wrapper(Deref, BorrowSlice, Index, RangeOps, LowerHex)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", transparent)
)]
pub struct OrderHash(
    #[from]
    #[from([u8; 32])]
    Bytes32,
);

impl OrderHash {
    /// Represents hash as a machine word for the order context.
    #[inline]
    pub fn to_word(&self) -> u256 { word_from_hash(self.0) }
}

impl Display for OrderHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { write!(f, "0x{}", self.0.to_hex()) }
}

impl Debug for OrderHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { write!(f, "OrderHash({self})") }
}
