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

//! Order context layout and intermediate results of order evaluations.

use alloc::vec::Vec;

use amplify::num::u256;

use super::{OrderHash, VaultKey};
use crate::core::StateKv;

/// Column with `[order hash, owner, counterparty]`.
pub const CALLING_CONTEXT_COLUMN: u8 = 1;
/// Column with `[outputMax, ioRatio]`, empty during calculate-IO.
pub const CALCULATIONS_COLUMN: u8 = 2;
/// Column describing the order input vault.
pub const VAULT_INPUTS_COLUMN: u8 = 3;
/// Column describing the order output vault.
pub const VAULT_OUTPUTS_COLUMN: u8 = 4;
/// Column with signers of the supplied signed contexts.
pub const SIGNERS_COLUMN: u8 = 5;
/// First column of the signed contexts.
pub const SIGNED_CONTEXT_START_COLUMN: u8 = 6;

/// Row of a vault column holding the token address.
pub const VAULT_IO_TOKEN: usize = 0;
/// Row of a vault column holding the token decimals.
pub const VAULT_IO_TOKEN_DECIMALS: usize = 1;
/// Row of a vault column holding the vault id.
pub const VAULT_IO_VAULT_ID: usize = 2;
/// Row of a vault column holding the vault balance before the trade.
pub const VAULT_IO_BALANCE_BEFORE: usize = 3;
/// Row of a vault column holding the realized balance change.
pub const VAULT_IO_BALANCE_DIFF: usize = 4;

/// Source computing `[outputMax, ioRatio]`.
pub const CALCULATE_ORDER_SOURCE: u16 = 0;
/// Source validating the realized trade.
pub const HANDLE_IO_SOURCE: u16 = 1;

/// Outputs of the calculate-IO evaluation, scaled to the token decimals.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct OrderIOCalculation {
    pub order_hash: OrderHash,
    /// Vault receiving the order input.
    pub input_vault: VaultKey,
    /// Vault sending the order output.
    pub output_vault: VaultKey,
    /// Maximal amount of output token the order sends, capped by its output vault balance.
    pub output_max: u256,
    /// Amount of input token required per unit of output token, as an 18-decimal value.
    pub io_ratio: u256,
    /// Context columns reused for the handle-IO evaluation.
    pub context: Vec<Vec<u256>>,
    /// Scratch state left by calculate-IO.
    pub state: StateKv,
}

impl OrderIOCalculation {
    pub(super) fn set_balance_diffs(&mut self, input: u256, output: u256) {
        for (column, diff) in [(VAULT_INPUTS_COLUMN, input), (VAULT_OUTPUTS_COLUMN, output)] {
            if let Some(cell) = self
                .context
                .get_mut(column as usize)
                .and_then(|column| column.get_mut(VAULT_IO_BALANCE_DIFF))
            {
                *cell = diff;
            }
        }
    }
}

/// Amounts moved by a clear of two orders.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ClearStateChange {
    /// Amount sent from the output vault of order A.
    pub a_output: u256,
    /// Amount sent from the output vault of order B.
    pub b_output: u256,
    /// Amount received by the input vault of order A.
    pub a_input: u256,
    /// Amount received by the input vault of order B.
    pub b_input: u256,
}
