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
use core::fmt::{self, Debug, Display, Formatter};

use amplify::confinement::{SmallBlob, SmallVec, TinyVec};
use amplify::hex::ToHex;
use amplify::num::u256;
use amplify::Bytes32;
use sha2::{Digest, Sha256};

use super::constants::{CONSTANTS_MAX_COUNT, EVALUABLE_ID_TAG, SOURCES_MAX_COUNT, SOURCE_MAX_LEN};
use super::Marshaller;
use crate::isa::{Bytecode, BytecodeRead, DecodeError, Instr, OperandError, INSTR_SIZE};

/// Unique content identifier of an [`Evaluable`].
#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default, From)]
#[wrapper(Deref, BorrowSlice, Index, RangeOps, LowerHex)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", transparent)
)]
pub struct EvaluableId(
    #[from]
    #[from([u8; 32])]
    Bytes32,
);

impl From<Sha256> for EvaluableId {
    fn from(hash: Sha256) -> Self {
        let mut buf = [0u8; 32];
        buf.copy_from_slice(&hash.finalize());
        Self(Bytes32::from_byte_array(buf))
    }
}

impl Display for EvaluableId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { write!(f, "0x{}", self.0.to_hex()) }
}

impl Debug for EvaluableId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { write!(f, "EvaluableId({self})") }
}

/// Errors of the static integrity check performed when an [`Evaluable`] is constructed.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum IntegrityError {
    /// evaluable contains {0} sources while at most 255 are allowed.
    TooManySources(usize),

    /// source #{0} is {1} bytes long, exceeding the limit of 65535 bytes.
    SourceTooLong(usize, usize),

    /// source #{0} is {1} bytes long, which is not a multiple of the 4-byte instruction size.
    SourceMisaligned(usize, usize),

    /// evaluable contains {0} constants while at most 65535 are allowed.
    TooManyConstants(usize),

    /// source #{0} at offset {1}: {2}
    Decode(usize, u16, DecodeError),

    /// source #{0} at offset {1}: instruction `{2}` {3}
    Operand(usize, u16, Instr, OperandError),

    /// source #{0} at offset {1}: instruction `{2}` underflows the stack.
    StackUnderflow(usize, u16, Instr),

    /// source #{0} at offset {1}: stack height exceeds 65535 values.
    StackOverflow(usize, u16),

    /// source #{0} leaves {1} values on the stack while at least {2} are required.
    MinStackOutputs(usize, u16, u16),
}

/// Stack heights of a source computed by the integrity check.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct StackHeights {
    /// Maximal height reached; the stack allocation for evaluations.
    pub max: u16,
    /// Height after the last instruction.
    pub end: u16,
}

/// Deployment input of an [`Evaluable`]: bytecode of each source and the constants pool.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct EvaluableConfig {
    pub sources: Vec<Vec<u8>>,
    pub constants: Vec<u256>,
}

/// Announcement of a deployed [`Evaluable`], echoing its resolved configuration.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Initialize {
    pub id: EvaluableId,
    pub config: EvaluableConfig,
    pub stack_heights: Vec<StackHeights>,
}

/// Compiles instructions into a source bytecode.
pub fn assemble<'i>(code: impl IntoIterator<Item = &'i Instr>) -> Result<Vec<u8>, super::MarshallError> {
    let mut marshaller = Marshaller::new();
    for instr in code {
        instr.encode_instr(&mut marshaller)?;
    }
    Ok(marshaller.finish())
}

/// Decodes source bytecode into instructions.
pub fn disassemble(code: impl AsRef<[u8]>) -> Result<Vec<Instr>, DecodeError> {
    let mut marshaller = Marshaller::with(code);
    let mut instrs = Vec::new();
    while !marshaller.is_eof() {
        instrs.push(Instr::decode_instr(&mut marshaller)?);
    }
    Ok(instrs)
}

/// Immutable program: one or more sources sharing a constants pool, validated at construction.
#[derive(Clone, Eq, PartialEq)]
pub struct Evaluable {
    id: EvaluableId,
    sources: TinyVec<SmallBlob>,
    constants: SmallVec<u256>,
    stack_heights: Vec<StackHeights>,
}

impl Evaluable {
    /// Validates the configuration and constructs evaluable.
    #[inline]
    pub fn new(config: EvaluableConfig) -> Result<Self, IntegrityError> { Self::with_min_outputs(config, &[]) }

    /// Validates the configuration and constructs evaluable, additionally requiring source `i` to
    /// finish with at least `min_outputs[i]` values on the stack.
    pub fn with_min_outputs(config: EvaluableConfig, min_outputs: &[u16]) -> Result<Self, IntegrityError> {
        let EvaluableConfig { sources, constants } = config;
        if sources.len() > SOURCES_MAX_COUNT {
            return Err(IntegrityError::TooManySources(sources.len()));
        }
        if constants.len() > CONSTANTS_MAX_COUNT {
            return Err(IntegrityError::TooManyConstants(constants.len()));
        }
        let constants_count = constants.len() as u16;

        let mut blobs = Vec::with_capacity(sources.len());
        let mut stack_heights = Vec::with_capacity(sources.len());
        for (index, code) in sources.into_iter().enumerate() {
            let len = code.len();
            if len > SOURCE_MAX_LEN {
                return Err(IntegrityError::SourceTooLong(index, len));
            }
            if len % INSTR_SIZE as usize != 0 {
                return Err(IntegrityError::SourceMisaligned(index, len));
            }
            let min = min_outputs.get(index).copied().unwrap_or_default();
            stack_heights.push(check_source(index, &code, constants_count, min)?);
            blobs.push(SmallBlob::try_from(code).map_err(|_| IntegrityError::SourceTooLong(index, len))?);
        }
        let count = blobs.len();
        let sources = TinyVec::try_from(blobs).map_err(|_| IntegrityError::TooManySources(count))?;
        let constants = SmallVec::try_from(constants)
            .map_err(|_| IntegrityError::TooManyConstants(constants_count as usize))?;

        let id = commit(&sources, &constants);
        tracing::debug!(%id, sources = sources.len(), constants = constants.len(), "evaluable deployed");
        Ok(Evaluable {
            id,
            sources,
            constants,
            stack_heights,
        })
    }

    #[inline]
    pub fn id(&self) -> EvaluableId { self.id }

    #[inline]
    pub fn source_count(&self) -> usize { self.sources.len() }

    /// Returns bytecode of the source with the given index.
    #[inline]
    pub fn source(&self, index: u16) -> Option<&[u8]> {
        self.sources.get(index as usize).map(|code| code.as_slice())
    }

    /// Returns stack heights of the source with the given index.
    #[inline]
    pub fn stack_heights(&self, index: u16) -> Option<StackHeights> {
        self.stack_heights.get(index as usize).copied()
    }

    #[inline]
    pub fn constants(&self) -> &[u256] { self.constants.as_slice() }

    /// Reconstructs deployment configuration.
    pub fn to_config(&self) -> EvaluableConfig {
        EvaluableConfig {
            sources: self.sources.iter().map(|code| code.to_vec()).collect(),
            constants: self.constants.to_vec(),
        }
    }

    /// Constructs announcement of the deployed evaluable.
    pub fn initialize_event(&self) -> Initialize {
        Initialize {
            id: self.id,
            config: self.to_config(),
            stack_heights: self.stack_heights.clone(),
        }
    }
}

impl Debug for Evaluable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluable")
            .field("id", &self.id)
            .field("sources", &self.sources.len())
            .field("constants", &self.constants.len())
            .field("stack_heights", &self.stack_heights)
            .finish()
    }
}

impl Display for Evaluable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID:     {}", self.id)?;
        writeln!(f, "CONSTS: {}", self.constants.len())?;
        for (index, code) in self.sources.iter().enumerate() {
            let heights = self.stack_heights[index];
            writeln!(f, "SOURCE #{index} (stack {}, outputs {}):", heights.max, heights.end)?;
            let Ok(instrs) = disassemble(code.as_slice()) else {
                return Err(fmt::Error);
            };
            for instr in instrs {
                writeln!(f, "    {instr}")?;
            }
        }
        Ok(())
    }
}

fn commit(sources: &TinyVec<SmallBlob>, constants: &SmallVec<u256>) -> EvaluableId {
    let mut engine = Sha256::new();
    engine.update(EVALUABLE_ID_TAG.as_bytes());
    engine.update([sources.len() as u8]);
    for code in sources.iter() {
        engine.update((code.len() as u16).to_be_bytes());
        engine.update(code.as_slice());
    }
    engine.update((constants.len() as u16).to_be_bytes());
    for constant in constants.iter() {
        engine.update(constant.to_be_bytes());
    }
    engine.into()
}

/// Walks the source simulating stack height of every instruction.
fn check_source(
    index: usize,
    code: &[u8],
    constants: u16,
    min_outputs: u16,
) -> Result<StackHeights, IntegrityError> {
    let mut marshaller = Marshaller::with(code);
    let mut heights = StackHeights::default();
    while !marshaller.is_eof() {
        let pos = marshaller.pos();
        let instr = Instr::decode_instr(&mut marshaller).map_err(|err| IntegrityError::Decode(index, pos, err))?;
        instr
            .check_operands(heights.end, constants)
            .map_err(|err| IntegrityError::Operand(index, pos, instr, err))?;
        heights.end = heights
            .end
            .checked_sub(instr.stack_inputs())
            .ok_or(IntegrityError::StackUnderflow(index, pos, instr))?;
        heights.end = heights
            .end
            .checked_add(instr.stack_outputs())
            .ok_or(IntegrityError::StackOverflow(index, pos))?;
        heights.max = heights.max.max(heights.end);
    }
    if heights.end < min_outputs {
        return Err(IntegrityError::MinStackOutputs(index, heights.end, min_outputs));
    }
    Ok(heights)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::isa::{ContextOperand, MemoryOperand};

    fn config(sources: &[&[Instr]], constants: usize) -> EvaluableConfig {
        EvaluableConfig {
            sources: sources.iter().map(|code| assemble(code.iter()).unwrap()).collect(),
            constants: vec![u256::ONE; constants],
        }
    }

    #[test]
    fn heights() {
        let code = [
            Instr::Read(MemoryOperand::constant(0).unwrap()),
            Instr::Read(MemoryOperand::constant(0).unwrap()),
            Instr::Read(MemoryOperand::stack(1).unwrap()),
            Instr::Add(3),
            Instr::Explode,
            Instr::Ensure(2),
        ];
        let evaluable = Evaluable::new(config(&[&code], 1)).unwrap();
        assert_eq!(evaluable.stack_heights(0), Some(StackHeights { max: 8, end: 6 }));
        assert_eq!(evaluable.stack_heights(1), None);
    }

    #[test]
    fn underflow() {
        let code = [Instr::Read(MemoryOperand::constant(0).unwrap()), Instr::Add(2)];
        assert_eq!(
            Evaluable::new(config(&[&code], 1)),
            Err(IntegrityError::StackUnderflow(0, 4, Instr::Add(2)))
        );
    }

    #[test]
    fn bad_constant() {
        let code = [Instr::Read(MemoryOperand::constant(1).unwrap())];
        assert_eq!(
            Evaluable::new(config(&[&code], 1)),
            Err(IntegrityError::Operand(
                0,
                0,
                Instr::Read(MemoryOperand::constant(1).unwrap()),
                OperandError::ConstantOutOfRange(1, 1)
            ))
        );
    }

    #[test]
    fn bad_context_column() {
        let code = [Instr::Context(ContextOperand::new(16, 0))];
        assert!(matches!(
            Evaluable::new(config(&[&code], 0)),
            Err(IntegrityError::Operand(0, 0, _, OperandError::ContextColumnOutOfRange(16)))
        ));
    }

    #[test]
    fn min_outputs() {
        let calc = [Instr::Read(MemoryOperand::constant(0).unwrap())];
        assert_eq!(
            Evaluable::with_min_outputs(config(&[&calc, &[]], 1), &[2, 0]),
            Err(IntegrityError::MinStackOutputs(0, 1, 2))
        );
        let calc = [Instr::Read(MemoryOperand::constant(0).unwrap()), Instr::Read(MemoryOperand::constant(0).unwrap())];
        assert!(Evaluable::with_min_outputs(config(&[&calc, &[]], 1), &[2, 0]).is_ok());
    }

    #[test]
    fn malformed_bytecode() {
        let evaluable = Evaluable::new(EvaluableConfig {
            sources: vec![vec![0, 0, 0]],
            constants: vec![],
        });
        assert_eq!(evaluable, Err(IntegrityError::SourceMisaligned(0, 3)));
        let evaluable = Evaluable::new(EvaluableConfig {
            sources: vec![vec![0xFF, 0xFF, 0, 0]],
            constants: vec![],
        });
        assert_eq!(evaluable, Err(IntegrityError::Decode(0, 0, DecodeError::UnknownOpcode(0xFFFF))));
        let evaluable = Evaluable::new(EvaluableConfig {
            sources: vec![vec![]; 256],
            constants: vec![],
        });
        assert_eq!(evaluable, Err(IntegrityError::TooManySources(256)));
    }

    #[test]
    fn id_commits_to_content() {
        let code = [Instr::Read(MemoryOperand::constant(0).unwrap())];
        let a = Evaluable::new(config(&[&code], 1)).unwrap();
        let b = Evaluable::new(config(&[&code], 2)).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), Evaluable::new(a.to_config()).unwrap().id());
        assert_eq!(a.initialize_event().stack_heights, vec![StackHeights { max: 1, end: 1 }]);
    }

    #[test]
    fn disassembly() {
        let code = [Instr::Read(MemoryOperand::constant(0).unwrap()), Instr::Read(MemoryOperand::stack(0).unwrap()), Instr::Mul(2)];
        let evaluable = Evaluable::new(config(&[&code], 1)).unwrap();
        assert_eq!(disassemble(evaluable.source(0).unwrap()), Ok(code.to_vec()));
        let listing = evaluable.to_string();
        assert!(listing.contains("read    constant 0"));
        assert!(listing.contains("mul     2"));
    }
}
