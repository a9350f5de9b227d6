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

//! Order book matching engine: vaults, orders evaluated by the interpreter, taking and
//! clearing of orders.

mod book;
mod calc;
mod events;
mod order;
mod vault;

pub use book::{
    ClearConfig, DepositConfig, OrderBook, OrderBookError, TakeOrderConfig, TakeOrdersConfig,
    WithdrawConfig,
};
pub use calc::{
    ClearStateChange, OrderIOCalculation, CALCULATE_ORDER_SOURCE, CALCULATIONS_COLUMN,
    CALLING_CONTEXT_COLUMN, HANDLE_IO_SOURCE, SIGNED_CONTEXT_START_COLUMN, SIGNERS_COLUMN,
    VAULT_INPUTS_COLUMN, VAULT_IO_BALANCE_BEFORE, VAULT_IO_BALANCE_DIFF, VAULT_IO_TOKEN,
    VAULT_IO_TOKEN_DECIMALS, VAULT_IO_VAULT_ID, VAULT_OUTPUTS_COLUMN,
};
pub use events::Event;
pub use order::{Order, OrderConfig, OrderHash, IO};
pub use vault::{VaultKey, VaultOverlay, Vaults};
