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

//! Instruction set of the expression VM: opcodes, operands, bytecode and execution.

mod bytecode;
mod exec;
mod instr;
mod integrity;
#[macro_use]
mod macros;
pub mod opcodes;
mod operand;

pub use bytecode::{Bytecode, BytecodeRead, BytecodeWrite, CodeEofError, DecodeError, INSTR_SIZE};
pub use exec::{EvalContext, ExecStep, InstructionSet};
pub use instr::Instr;
pub use integrity::OperandError;
pub use operand::{
    ContextOperand, MemoryOperand, MemoryType, SelectLte, TierRange, MEMORY_INDEX_MAX,
};
