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

use alloc::vec::Vec;

use amplify::num::u256;

use super::{
    ClearConfig, ClearStateChange, DepositConfig, Order, OrderHash, TakeOrderConfig,
    WithdrawConfig,
};
use crate::evaluable::{EvaluableId, Initialize};
use crate::Address;

/// Events emitted by the [`super::OrderBook`] operations.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Event {
    /// Evaluable of a new order was deployed.
    Initialize(Initialize),

    AddOrder {
        sender: Address,
        evaluable_id: EvaluableId,
        order: Order,
        order_hash: OrderHash,
    },

    RemoveOrder {
        sender: Address,
        order: Order,
        order_hash: OrderHash,
    },

    Deposit {
        sender: Address,
        config: DepositConfig,
    },

    /// Withdrawal with the actually withdrawn amount, which may be below the requested one.
    Withdraw {
        sender: Address,
        config: WithdrawConfig,
        amount: u256,
    },

    TakeOrder {
        sender: Address,
        config: TakeOrderConfig,
        input: u256,
        output: u256,
    },

    /// Order supplied for taking is not live.
    OrderNotFound {
        sender: Address,
        owner: Address,
        order_hash: OrderHash,
    },

    /// Order supplied for taking offers zero output.
    OrderZeroAmount {
        sender: Address,
        owner: Address,
        order_hash: OrderHash,
    },

    /// Order supplied for taking asks for more than the maximal IO ratio.
    OrderExceedsMaxRatio {
        sender: Address,
        owner: Address,
        order_hash: OrderHash,
    },

    /// Context of an order evaluation with the realized balance changes.
    Context {
        sender: Address,
        context: Vec<Vec<u256>>,
    },

    Clear {
        sender: Address,
        alice: Order,
        bob: Order,
        config: ClearConfig,
    },

    AfterClear {
        sender: Address,
        clear_state_change: ClearStateChange,
    },
}

impl Event {
    /// Name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Initialize(_) => "Initialize",
            Event::AddOrder { .. } => "AddOrder",
            Event::RemoveOrder { .. } => "RemoveOrder",
            Event::Deposit { .. } => "Deposit",
            Event::Withdraw { .. } => "Withdraw",
            Event::TakeOrder { .. } => "TakeOrder",
            Event::OrderNotFound { .. } => "OrderNotFound",
            Event::OrderZeroAmount { .. } => "OrderZeroAmount",
            Event::OrderExceedsMaxRatio { .. } => "OrderExceedsMaxRatio",
            Event::Context { .. } => "Context",
            Event::Clear { .. } => "Clear",
            Event::AfterClear { .. } => "AfterClear",
        }
    }
}
