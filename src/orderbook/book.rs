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

use alloc::collections::BTreeSet;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use amplify::num::u256;

use super::calc::{CALCULATE_ORDER_SOURCE, CALCULATIONS_COLUMN, HANDLE_IO_SOURCE};
use super::{
    ClearStateChange, Event, Order, OrderConfig, OrderHash, OrderIOCalculation, VaultKey,
    VaultOverlay, Vaults, IO,
};
use crate::core::{Context, ContextBuilder, ContextError, SignatureVerifier, SignedContext};
use crate::data::{fixed_point_mul, scale_n_saturating, scale_ratio, MathError};
use crate::evaluable::{Evaluable, IntegrityError};
use crate::vm::{Dispatch, EvalError, Interpreter};
use crate::Address;

/// Minimal number of values calculate-IO must leave on the stack.
const CALCULATE_ORDER_MIN_OUTPUTS: u16 = 2;

/// Errors of the order book operations. Any error reverts all changes of the operation.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum OrderBookError {
    /// order must have at least one valid input.
    OrderNoInputs,

    /// order must have at least one valid output.
    OrderNoOutputs,

    /// order expression must have at least one source.
    OrderNoSources,

    /// sender {0} is not the owner {1} of the order.
    NotOrderOwner(Address, Address),

    /// deposit amount must be non-zero.
    ZeroDepositAmount,

    /// withdrawal amount must be non-zero.
    ZeroWithdrawAmount,

    /// token {0} does not match the expected token {1}.
    TokenMismatch(Address, Address),

    /// token decimals {0} do not match the expected decimals {1}.
    TokenDecimalsMismatch(u8, u8),

    /// both orders are owned by {0}.
    SameOwner(Address),

    /// order {0} is not live.
    OrderNotFound(OrderHash),

    /// order has no valid input with index {0}.
    InputIndexOutOfRange(usize),

    /// order has no valid output with index {0}.
    OutputIndexOutOfRange(usize),

    /// taken orders provide less input than the required minimum.
    MinimumInput { minimum: u256, total: u256 },

    /// calculate-IO of order {0} returned {1} values instead of two.
    CalculationOutputs(OrderHash, usize),

    /// {0}
    #[from]
    Integrity(IntegrityError),

    /// {0}
    #[from]
    Eval(EvalError),

    /// {0}
    #[from]
    Context(ContextError),

    /// {0}
    #[from]
    Math(MathError),
}

/// Direct vault deposit.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct DepositConfig {
    pub token: Address,
    pub vault_id: u256,
    pub amount: u256,
}

/// Direct vault withdrawal; the amount is capped at the vault balance.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct WithdrawConfig {
    pub token: Address,
    pub vault_id: u256,
    pub amount: u256,
}

/// Single order taken by [`OrderBook::take_orders`].
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TakeOrderConfig {
    pub order: Order,
    pub input_io_index: usize,
    pub output_io_index: usize,
    pub signed_context: Vec<SignedContext>,
}

/// Parameters of [`OrderBook::take_orders`], from the point of view of the taker.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TakeOrdersConfig {
    /// Token the taker sends, which is the input token of the orders.
    pub output: Address,
    /// Token the taker receives, which is the output token of the orders.
    pub input: Address,
    pub minimum_input: u256,
    pub maximum_input: u256,
    /// Maximal accepted amount of output per unit of input, as an 18-decimal value.
    pub maximum_io_ratio: u256,
    /// Orders taken sequentially until the maximum input is reached.
    pub orders: Vec<TakeOrderConfig>,
}

/// Vault indexes and bounty vaults of [`OrderBook::clear`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ClearConfig {
    pub a_input_io_index: usize,
    pub a_output_io_index: usize,
    pub b_input_io_index: usize,
    pub b_output_io_index: usize,
    /// Sender vault receiving the surplus of the A output token.
    pub a_bounty_vault_id: u256,
    /// Sender vault receiving the surplus of the B output token.
    pub b_bounty_vault_id: u256,
}

/// Changes staged by an operation, committed only when the whole operation succeeds.
struct Journal<'a> {
    vaults: VaultOverlay<'a>,
    events: Vec<Event>,
}

/// Order matching engine owning vault balances and the set of live orders.
#[derive(Clone, Debug)]
pub struct OrderBook<V: SignatureVerifier> {
    address: Address,
    interpreter: Interpreter,
    verifier: V,
    vaults: Vaults,
    orders: BTreeSet<OrderHash>,
    events: Vec<Event>,
}

impl<V: SignatureVerifier> OrderBook<V> {
    /// Constructs empty order book located at `address`, using the default interpreter.
    pub fn new(address: Address, verifier: V) -> Self { Self::with(address, verifier, Interpreter::new()) }

    /// Constructs empty order book evaluating orders with the given interpreter.
    pub fn with(address: Address, verifier: V, interpreter: Interpreter) -> Self {
        OrderBook {
            address,
            interpreter,
            verifier,
            vaults: Vaults::new(),
            orders: BTreeSet::new(),
            events: vec![],
        }
    }

    #[inline]
    pub fn address(&self) -> Address { self.address }

    /// Balance of a vault; absent vaults have zero balance.
    #[inline]
    pub fn vault_balance(&self, owner: Address, token: Address, vault_id: u256) -> u256 {
        self.vaults.balance(&VaultKey::new(owner, token, vault_id))
    }

    /// Checks whether the order with the given hash is live.
    #[inline]
    pub fn is_live(&self, order_hash: OrderHash) -> bool { self.orders.contains(&order_hash) }

    /// Events emitted by all successful operations so far.
    #[inline]
    pub fn events(&self) -> &[Event] { &self.events }

    /// Takes out emitted events.
    #[inline]
    pub fn drain_events(&mut self) -> Vec<Event> { core::mem::take(&mut self.events) }

    fn commit(&mut self, writes: Vec<(VaultKey, u256)>, events: Vec<Event>) {
        self.vaults.commit(writes);
        self.events.extend(events);
    }

    /// Deploys the order expression and makes the order live.
    pub fn add_order(&mut self, sender: Address, config: OrderConfig) -> Result<Order, OrderBookError> {
        let OrderConfig {
            valid_inputs,
            valid_outputs,
            evaluable_config,
            data,
        } = config;
        if valid_inputs.is_empty() {
            return Err(OrderBookError::OrderNoInputs);
        }
        if valid_outputs.is_empty() {
            return Err(OrderBookError::OrderNoOutputs);
        }
        if evaluable_config.sources.is_empty() {
            return Err(OrderBookError::OrderNoSources);
        }
        let handle_io = evaluable_config.sources.len() > HANDLE_IO_SOURCE as usize;
        let evaluable =
            Evaluable::with_min_outputs(evaluable_config, &[CALCULATE_ORDER_MIN_OUTPUTS, 0])?;
        let initialize = evaluable.initialize_event();

        let order = Order {
            owner: sender,
            handle_io,
            evaluable: Arc::new(evaluable),
            valid_inputs,
            valid_outputs,
            data,
        };
        let order_hash = order.hash();
        self.orders.insert(order_hash);
        tracing::debug!(%sender, %order_hash, handle_io, "order added");

        self.events.push(Event::Initialize(initialize));
        self.events.push(Event::AddOrder {
            sender,
            evaluable_id: order.evaluable.id(),
            order: order.clone(),
            order_hash,
        });
        Ok(order)
    }

    /// Makes the order dead; only its owner may remove it.
    pub fn remove_order(&mut self, sender: Address, order: &Order) -> Result<(), OrderBookError> {
        if sender != order.owner {
            return Err(OrderBookError::NotOrderOwner(sender, order.owner));
        }
        let order_hash = order.hash();
        self.orders.remove(&order_hash);
        tracing::debug!(%sender, %order_hash, "order removed");
        self.events.push(Event::RemoveOrder {
            sender,
            order: order.clone(),
            order_hash,
        });
        Ok(())
    }

    /// Credits the sender vault. Token custody is handled by the caller.
    pub fn deposit(&mut self, sender: Address, config: DepositConfig) -> Result<(), OrderBookError> {
        if config.amount == u256::ZERO {
            return Err(OrderBookError::ZeroDepositAmount);
        }
        let mut vaults = VaultOverlay::new(&self.vaults);
        vaults.credit(VaultKey::new(sender, config.token, config.vault_id), config.amount)?;
        let writes = vaults.into_writes();
        tracing::debug!(%sender, token = %config.token, vault_id = ?config.vault_id, "deposit");
        self.commit(writes, vec![Event::Deposit { sender, config }]);
        Ok(())
    }

    /// Debits the sender vault by at most its balance.
    ///
    /// # Returns
    ///
    /// Actually withdrawn amount, which the caller transfers to the sender.
    pub fn withdraw(&mut self, sender: Address, config: WithdrawConfig) -> Result<u256, OrderBookError> {
        if config.amount == u256::ZERO {
            return Err(OrderBookError::ZeroWithdrawAmount);
        }
        let key = VaultKey::new(sender, config.token, config.vault_id);
        let mut vaults = VaultOverlay::new(&self.vaults);
        let amount = config.amount.min(vaults.balance(&key));
        if amount > u256::ZERO {
            vaults.debit(key, amount)?;
        }
        let writes = vaults.into_writes();
        tracing::debug!(%sender, token = %config.token, vault_id = ?config.vault_id, "withdrawal");
        self.commit(writes, vec![Event::Withdraw {
            sender,
            config,
            amount,
        }]);
        Ok(amount)
    }

    /// Takes orders in the given sequence until `maximum_input` of the input token is collected.
    ///
    /// # Returns
    ///
    /// Total input the taker receives and total output the taker pays.
    pub fn take_orders(
        &mut self,
        sender: Address,
        config: TakeOrdersConfig,
    ) -> Result<(u256, u256), OrderBookError> {
        let mut journal = Journal {
            vaults: VaultOverlay::new(&self.vaults),
            events: vec![],
        };
        let mut remaining = config.maximum_input;
        let mut total_output = u256::ZERO;

        for take in &config.orders {
            if remaining == u256::ZERO {
                break;
            }
            let order = &take.order;
            let order_hash = order.hash();
            if !self.orders.contains(&order_hash) {
                tracing::debug!(%order_hash, "skipping dead order");
                journal.events.push(Event::OrderNotFound {
                    sender,
                    owner: order.owner,
                    order_hash,
                });
                continue;
            }
            let (order_input, order_output) = ios(order, take.input_io_index, take.output_io_index)?;
            if order_input.token != config.output {
                return Err(OrderBookError::TokenMismatch(order_input.token, config.output));
            }
            if order_output.token != config.input {
                return Err(OrderBookError::TokenMismatch(order_output.token, config.input));
            }

            let calc = self.calculate_order_io(
                &journal.vaults,
                sender,
                order,
                take.input_io_index,
                take.output_io_index,
                sender,
                &take.signed_context,
            )?;
            if calc.io_ratio > config.maximum_io_ratio {
                tracing::debug!(%order_hash, "skipping order exceeding maximal ratio");
                journal.events.push(Event::OrderExceedsMaxRatio {
                    sender,
                    owner: order.owner,
                    order_hash,
                });
            } else if calc.output_max == u256::ZERO {
                tracing::debug!(%order_hash, "skipping order with zero output");
                journal.events.push(Event::OrderZeroAmount {
                    sender,
                    owner: order.owner,
                    order_hash,
                });
            } else {
                let input = remaining.min(calc.output_max);
                let output = fixed_point_mul(input, calc.io_ratio)?;
                remaining = remaining.checked_sub(input).ok_or(MathError::Underflow)?;
                total_output = total_output.checked_add(output).ok_or(MathError::Overflow)?;
                self.record_vault_io(&mut journal, sender, order, output, input, calc)?;
                journal.events.push(Event::TakeOrder {
                    sender,
                    config: take.clone(),
                    input,
                    output,
                });
            }
        }

        let total_input = config
            .maximum_input
            .checked_sub(remaining)
            .ok_or(MathError::Underflow)?;
        if total_input < config.minimum_input {
            return Err(OrderBookError::MinimumInput {
                minimum: config.minimum_input,
                total: total_input,
            });
        }
        tracing::debug!(%sender, orders = config.orders.len(), "orders taken");

        let Journal { vaults, events } = journal;
        let writes = vaults.into_writes();
        self.commit(writes, events);
        Ok((total_input, total_output))
    }

    /// Matches two orders against each other, crediting the spread to the sender bounty vaults.
    pub fn clear(
        &mut self,
        sender: Address,
        a: &Order,
        b: &Order,
        config: ClearConfig,
        a_signed_context: &[SignedContext],
        b_signed_context: &[SignedContext],
    ) -> Result<ClearStateChange, OrderBookError> {
        if a.owner == b.owner {
            return Err(OrderBookError::SameOwner(a.owner));
        }
        let (a_input, a_output) = ios(a, config.a_input_io_index, config.a_output_io_index)?;
        let (b_input, b_output) = ios(b, config.b_input_io_index, config.b_output_io_index)?;
        for (input, output) in [(a_input, b_output), (b_input, a_output)] {
            if input.token != output.token {
                return Err(OrderBookError::TokenMismatch(input.token, output.token));
            }
            if input.decimals != output.decimals {
                return Err(OrderBookError::TokenDecimalsMismatch(input.decimals, output.decimals));
            }
        }
        for order in [a, b] {
            let order_hash = order.hash();
            if !self.orders.contains(&order_hash) {
                return Err(OrderBookError::OrderNotFound(order_hash));
            }
        }

        let mut journal = Journal {
            vaults: VaultOverlay::new(&self.vaults),
            events: vec![Event::Clear {
                sender,
                alice: a.clone(),
                bob: b.clone(),
                config,
            }],
        };
        let a_calc = self.calculate_order_io(
            &journal.vaults,
            sender,
            a,
            config.a_input_io_index,
            config.a_output_io_index,
            b.owner,
            b_signed_context,
        )?;
        let b_calc = self.calculate_order_io(
            &journal.vaults,
            sender,
            b,
            config.b_input_io_index,
            config.b_output_io_index,
            a.owner,
            a_signed_context,
        )?;
        let change = clear_state_change(&a_calc, &b_calc)?;

        self.record_vault_io(&mut journal, sender, a, change.a_input, change.a_output, a_calc)?;
        self.record_vault_io(&mut journal, sender, b, change.b_input, change.b_output, b_calc)?;

        let a_bounty = change.a_output.checked_sub(change.b_input).ok_or(MathError::Underflow)?;
        let b_bounty = change.b_output.checked_sub(change.a_input).ok_or(MathError::Underflow)?;
        if a_bounty > u256::ZERO {
            let key = VaultKey::new(sender, a_output.token, config.a_bounty_vault_id);
            journal.vaults.credit(key, a_bounty)?;
        }
        if b_bounty > u256::ZERO {
            let key = VaultKey::new(sender, b_output.token, config.b_bounty_vault_id);
            journal.vaults.credit(key, b_bounty)?;
        }
        tracing::debug!(%sender, a = %a.hash(), b = %b.hash(), "orders cleared");

        journal.events.push(Event::AfterClear {
            sender,
            clear_state_change: change,
        });
        let Journal { vaults, events } = journal;
        let writes = vaults.into_writes();
        self.commit(writes, events);
        Ok(change)
    }

    /// Evaluates calculate-IO of the order against the current vault balances.
    #[allow(clippy::too_many_arguments)]
    fn calculate_order_io(
        &self,
        vaults: &VaultOverlay<'_>,
        sender: Address,
        order: &Order,
        input_io_index: usize,
        output_io_index: usize,
        counterparty: Address,
        signed_context: &[SignedContext],
    ) -> Result<OrderIOCalculation, OrderBookError> {
        let order_hash = order.hash();
        let (input, output) = ios(order, input_io_index, output_io_index)?;
        let input_balance = vaults.balance(&VaultKey::new(order.owner, input.token, input.vault_id));
        let output_balance = vaults.balance(&VaultKey::new(order.owner, output.token, output.vault_id));

        let context = ContextBuilder::new(&self.verifier, sender, self.address)
            .with_column(vec![order_hash.to_word(), order.owner.to_word(), counterparty.to_word()])
            .with_column(vec![])
            .with_column(vault_column(&input, input_balance))
            .with_column(vault_column(&output, output_balance))
            .build(signed_context)?;

        let outcome = self.interpreter.eval(
            &order.evaluable,
            Dispatch::new(CALCULATE_ORDER_SOURCE, CALCULATE_ORDER_MIN_OUTPUTS),
            &context,
        )?;
        let [output_max, io_ratio] = outcome.stack[..] else {
            return Err(OrderBookError::CalculationOutputs(order_hash, outcome.stack.len()));
        };

        let output_max = scale_n_saturating(output_max, output.decimals).min(output_balance);
        let io_ratio = scale_ratio(io_ratio, output.decimals, input.decimals)?;
        tracing::debug!(%order_hash, output_max = ?output_max, io_ratio = ?io_ratio, "order calculated");

        let mut columns = context.into_columns();
        if let Some(column) = columns.get_mut(CALCULATIONS_COLUMN as usize) {
            *column = vec![output_max, io_ratio];
        }
        Ok(OrderIOCalculation {
            order_hash,
            input_vault: VaultKey::new(order.owner, input.token, input.vault_id),
            output_vault: VaultKey::new(order.owner, output.token, output.vault_id),
            output_max,
            io_ratio,
            context: columns,
            state: outcome.state,
        })
    }

    /// Moves realized amounts through the order vaults and runs its handle-IO.
    fn record_vault_io(
        &self,
        journal: &mut Journal<'_>,
        sender: Address,
        order: &Order,
        input: u256,
        output: u256,
        mut calc: OrderIOCalculation,
    ) -> Result<(), OrderBookError> {
        calc.set_balance_diffs(input, output);
        if input > u256::ZERO {
            journal.vaults.credit(calc.input_vault, input)?;
        }
        if output > u256::ZERO {
            journal.vaults.debit(calc.output_vault, output)?;
        }
        journal.events.push(Event::Context {
            sender,
            context: calc.context.clone(),
        });

        if order.handle_io {
            let context = Context::new(calc.context)?;
            self.interpreter.eval_with_state(
                &order.evaluable,
                Dispatch::new(HANDLE_IO_SOURCE, 0),
                &context,
                calc.state,
            )?;
        }
        Ok(())
    }
}

fn ios(order: &Order, input_io_index: usize, output_io_index: usize) -> Result<(IO, IO), OrderBookError> {
    let input = order
        .input(input_io_index)
        .ok_or(OrderBookError::InputIndexOutOfRange(input_io_index))?;
    let output = order
        .output(output_io_index)
        .ok_or(OrderBookError::OutputIndexOutOfRange(output_io_index))?;
    Ok((*input, *output))
}

fn vault_column(io: &IO, balance: u256) -> Vec<u256> {
    vec![io.token.to_word(), u256::from(io.decimals as u64), io.vault_id, balance, u256::ZERO]
}

fn clear_state_change(
    a: &OrderIOCalculation,
    b: &OrderIOCalculation,
) -> Result<ClearStateChange, MathError> {
    let a_output = a.output_max.min(fixed_point_mul(b.output_max, b.io_ratio)?);
    let b_output = b.output_max.min(fixed_point_mul(a.output_max, a.io_ratio)?);
    Ok(ClearStateChange {
        a_output,
        b_output,
        a_input: fixed_point_mul(a_output, a.io_ratio)?,
        b_input: fixed_point_mul(b_output, b.io_ratio)?,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn calc(output_max: u256, io_ratio: u256) -> OrderIOCalculation {
        let vault = VaultKey::new(Address::default(), Address::default(), u256::ZERO);
        OrderIOCalculation {
            order_hash: OrderHash::default(),
            input_vault: vault,
            output_vault: vault,
            output_max,
            io_ratio,
            context: vec![],
            state: default!(),
        }
    }

    fn mul(a: u64, b: u64) -> u256 { u256::from(a).checked_mul(u256::from(b)).unwrap() }

    #[test]
    fn state_change_takes_smaller_side() {
        let thousand = mul(1000, 1_000_000_000_000_000_000);
        let a = calc(thousand, mul(90, 1_000_000_000_000_000_000));
        let b = calc(thousand, u256::from(11_111_111_111_111_111u64));
        let change = clear_state_change(&a, &b).unwrap();
        assert_eq!(change.a_output, mul(11_111_111_111_111_111, 1000));
        assert_eq!(change.b_output, thousand);
        assert_eq!(change.a_input, mul(99_999_999_999_999_999, 10_000));
        assert_eq!(change.b_input, mul(11_111_111_111_111_111, 1000));
    }

    #[test]
    fn state_change_overflow() {
        let a = calc(u256::MAX, u256::MAX);
        let b = calc(u256::MAX, u256::MAX);
        assert_eq!(clear_state_change(&a, &b), Err(MathError::Overflow));
    }
}
