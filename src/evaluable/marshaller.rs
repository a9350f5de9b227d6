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
use core::fmt::{self, Debug, Formatter};

use super::constants::SOURCE_MAX_LEN;
use crate::isa::{BytecodeRead, BytecodeWrite, CodeEofError};

/// Errors write operations
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum MarshallError {
    /// attempt to read or write outside of code segment (i.e. at position > 0xFFFF).
    #[from(CodeEofError)]
    CodeNotFittingSegment,
}

/// Marshals instructions to and from bytecode representation.
pub struct Marshaller<C>
where C: AsRef<[u8]>
{
    byte_pos: u16,
    bytecode: C,
}

impl<C> Debug for Marshaller<C>
where C: AsRef<[u8]>
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marshaller")
            .field("bytecode", &self.bytecode.as_ref())
            .field("byte_pos", &self.byte_pos)
            .finish()
    }
}

impl Marshaller<Vec<u8>> {
    /// Creates a new marshaller with an empty bytecode.
    #[inline]
    pub fn new() -> Self {
        Self {
            bytecode: default!(),
            byte_pos: 0,
        }
    }

    /// Completes marshalling, returning produced bytecode.
    #[inline]
    pub fn finish(self) -> Vec<u8> { self.bytecode }
}

impl Default for Marshaller<Vec<u8>> {
    fn default() -> Self { Self::new() }
}

impl<C> Marshaller<C>
where C: AsRef<[u8]>
{
    /// Create marshaller from byte string utilizing existing bytecode.
    #[inline]
    pub fn with(bytecode: C) -> Self {
        Self {
            bytecode,
            byte_pos: 0,
        }
    }

    #[inline]
    fn inc_bytes(&mut self, byte_count: u16) -> Result<(), CodeEofError> {
        self.byte_pos = self.byte_pos.checked_add(byte_count).ok_or(CodeEofError)?;
        Ok(())
    }
}

impl<C> BytecodeRead for Marshaller<C>
where C: AsRef<[u8]>
{
    #[inline]
    fn pos(&self) -> u16 { self.byte_pos }

    #[inline]
    fn is_eof(&self) -> bool { self.byte_pos as usize >= self.bytecode.as_ref().len() }

    fn read_word(&mut self) -> Result<u16, CodeEofError> {
        let pos = self.byte_pos as usize;
        let Some(bytes) = self.bytecode.as_ref().get(pos..pos + 2) else {
            return Err(CodeEofError);
        };
        let word = u16::from_be_bytes([bytes[0], bytes[1]]);
        self.inc_bytes(2)?;
        Ok(word)
    }
}

impl BytecodeWrite for Marshaller<Vec<u8>> {
    type Error = MarshallError;

    fn write_word(&mut self, data: u16) -> Result<(), MarshallError> {
        if self.bytecode.len() + 2 > SOURCE_MAX_LEN {
            return Err(MarshallError::CodeNotFittingSegment);
        }
        self.bytecode.extend(data.to_be_bytes());
        self.byte_pos = self.bytecode.len() as u16;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_words() {
        let mut marshaller = Marshaller::with([0x00u8, 0x04, 0x12, 0x34, 0xFF]);
        assert_eq!(marshaller.read_word(), Ok(4));
        assert_eq!(marshaller.read_word(), Ok(0x1234));
        assert_eq!(marshaller.pos(), 4);
        assert!(!marshaller.is_eof());
        assert_eq!(marshaller.read_word(), Err(CodeEofError));
    }

    #[test]
    fn write_words() {
        let mut marshaller = Marshaller::new();
        marshaller.write_word(0x0102).unwrap();
        marshaller.write_word(0xFFEE).unwrap();
        assert_eq!(marshaller.pos(), 4);
        assert_eq!(marshaller.finish(), vec![0x01, 0x02, 0xFF, 0xEE]);
    }

    #[test]
    fn write_limit() {
        let mut marshaller = Marshaller::new();
        for _ in 0..SOURCE_MAX_LEN / 2 {
            marshaller.write_word(0).unwrap();
        }
        assert_eq!(marshaller.write_word(0), Err(MarshallError::CodeNotFittingSegment));
    }
}
