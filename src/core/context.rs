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

//! Context matrix provided to evaluations, and its assembly from caller-supplied data.

use alloc::vec;
use alloc::vec::Vec;

use amplify::num::u256;
use sha2::{Digest, Sha256};

use crate::data::words_to_be_bytes;
use crate::Address;

/// Maximal number of context columns.
pub const CONTEXT_COLUMNS_MAX: usize = 16;

/// Maximal number of rows in a context column.
pub const CONTEXT_ROWS_MAX: usize = 256;

/// Column of the base context: `[sender, contract]`.
pub const CONTEXT_BASE_COLUMN: u8 = 0;

/// Errors assembling context matrix.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum ContextError {
    /// context has {0} columns while at most 16 are allowed.
    TooManyColumns(usize),

    /// context column {0} has {1} rows while at most 256 are allowed.
    TooManyRows(usize, usize),

    /// signature of the signed context #{0} does not match its signer {1}.
    InvalidSignature(usize, Address),
}

/// Read-only two-dimensional matrix of words, indexed by column and row.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Context {
    columns: Vec<Vec<u256>>,
}

impl Context {
    /// Constructs context, checking its dimensions.
    pub fn new(columns: Vec<Vec<u256>>) -> Result<Self, ContextError> {
        if columns.len() > CONTEXT_COLUMNS_MAX {
            return Err(ContextError::TooManyColumns(columns.len()));
        }
        if let Some((index, column)) = columns
            .iter()
            .enumerate()
            .find(|(_, column)| column.len() > CONTEXT_ROWS_MAX)
        {
            return Err(ContextError::TooManyRows(index, column.len()));
        }
        Ok(Context { columns })
    }

    /// Constructs context without any columns.
    #[inline]
    pub fn empty() -> Self { Context::default() }

    /// Returns cell value, if the cell is present.
    #[inline]
    pub fn cell(&self, column: u8, row: usize) -> Option<u256> {
        self.columns.get(column as usize)?.get(row).copied()
    }

    #[inline]
    pub fn column(&self, column: u8) -> Option<&[u256]> {
        self.columns.get(column as usize).map(Vec::as_slice)
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize { self.columns.len() }

    #[inline]
    pub fn as_columns(&self) -> &[Vec<u256>] { &self.columns }

    #[inline]
    pub fn into_columns(self) -> Vec<Vec<u256>> { self.columns }
}

/// Row of words signed by an off-chain signer.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SignedContext {
    pub signer: Address,
    pub signature: Vec<u8>,
    pub context: Vec<u256>,
}

impl SignedContext {
    /// Message digest committed to by the signature: SHA256 over the big-endian words.
    pub fn message_hash(&self) -> [u8; 32] { message_hash(&self.context) }
}

/// SHA256 digest of a big-endian serialized sequence of words.
pub fn message_hash(words: &[u256]) -> [u8; 32] {
    let mut engine = Sha256::new();
    engine.update(words_to_be_bytes(words));
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&engine.finalize());
    hash
}

/// Pluggable signature verification capability.
pub trait SignatureVerifier {
    /// Checks whether `signature` over the `message` digest is produced by the `signer`.
    fn verify(&self, signer: &Address, message: &[u8; 32], signature: &[u8]) -> bool;
}

impl<F> SignatureVerifier for F
where F: Fn(&Address, &[u8; 32], &[u8]) -> bool
{
    #[inline]
    fn verify(&self, signer: &Address, message: &[u8; 32], signature: &[u8]) -> bool {
        self(signer, message, signature)
    }
}

/// Assembles context matrix from the base context, caller columns and signed contexts.
pub struct ContextBuilder<'v, V: SignatureVerifier + ?Sized> {
    verifier: &'v V,
    columns: Vec<Vec<u256>>,
}

impl<'v, V: SignatureVerifier + ?Sized> ContextBuilder<'v, V> {
    /// Starts context with the base column `[sender, this]`.
    pub fn new(verifier: &'v V, sender: Address, this: Address) -> Self {
        ContextBuilder {
            verifier,
            columns: vec![vec![sender.to_word(), this.to_word()]],
        }
    }

    /// Appends caller-defined column.
    pub fn with_column(mut self, column: Vec<u256>) -> Self {
        self.columns.push(column);
        self
    }

    /// Verifies signed contexts and completes the matrix.
    ///
    /// If any signed contexts are given, appends a column with their signers followed by a
    /// column per signed context.
    pub fn build(mut self, signed: &[SignedContext]) -> Result<Context, ContextError> {
        if !signed.is_empty() {
            for (index, item) in signed.iter().enumerate() {
                if !self.verifier.verify(&item.signer, &item.message_hash(), &item.signature) {
                    tracing::debug!(index, signer = %item.signer, "signed context rejected");
                    return Err(ContextError::InvalidSignature(index, item.signer));
                }
            }
            self.columns
                .push(signed.iter().map(|item| item.signer.to_word()).collect());
            self.columns
                .extend(signed.iter().map(|item| item.context.clone()));
        }
        Context::new(self.columns)
    }
}

#[cfg(feature = "secp256k1")]
pub use self::secp::Secp256k1Verifier;

#[cfg(feature = "secp256k1")]
mod secp {
    use alloc::vec::Vec;

    use amplify::num::u256;
    use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
    use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
    use sha2::{Digest, Sha256};

    use super::{message_hash, SignatureVerifier, SignedContext};
    use crate::Address;

    /// Verifier of 65-byte recoverable secp256k1 ECDSA signatures (64-byte compact signature
    /// followed by the recovery id).
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Secp256k1Verifier;

    impl Secp256k1Verifier {
        /// Address of a public key: the last 20 bytes of SHA256 hash of the uncompressed key
        /// without its prefix byte.
        pub fn address(pk: &PublicKey) -> Address {
            let digest = Sha256::digest(&pk.serialize_uncompressed()[1..]);
            let mut buf = [0u8; 20];
            buf.copy_from_slice(&digest[12..]);
            Address::from_byte_array(buf)
        }

        /// Signs the context row, producing [`SignedContext`].
        pub fn sign(sk: &SecretKey, context: Vec<u256>) -> SignedContext {
            let msg = Message::from_digest(message_hash(&context));
            let (rec_id, compact) = SECP256K1
                .sign_ecdsa_recoverable(&msg, sk)
                .serialize_compact();
            let mut signature = compact.to_vec();
            signature.push(rec_id.to_i32() as u8);
            SignedContext {
                signer: Self::address(&sk.public_key(SECP256K1)),
                signature,
                context,
            }
        }
    }

    impl SignatureVerifier for Secp256k1Verifier {
        fn verify(&self, signer: &Address, message: &[u8; 32], signature: &[u8]) -> bool {
            if signature.len() != 65 {
                return false;
            }
            let v = signature[64];
            let v = if v >= 27 { v - 27 } else { v };
            let Ok(rec_id) = RecoveryId::from_i32(v as i32) else {
                return false;
            };
            let Ok(sig) = RecoverableSignature::from_compact(&signature[..64], rec_id) else {
                return false;
            };
            let msg = Message::from_digest(*message);
            SECP256K1
                .recover_ecdsa(&msg, &sig)
                .map(|pk| Self::address(&pk) == *signer)
                .unwrap_or(false)
        }
    }

}

#[cfg(test)]
mod test {
    use super::*;

    fn addr(byte: u8) -> Address { Address::from_byte_array([byte; 20]) }

    fn accept_all(_: &Address, _: &[u8; 32], _: &[u8]) -> bool { true }

    #[test]
    fn dimensions() {
        assert_eq!(Context::new(vec![vec![]; 17]), Err(ContextError::TooManyColumns(17)));
        assert_eq!(
            Context::new(vec![vec![], vec![u256::ZERO; 257]]),
            Err(ContextError::TooManyRows(1, 257))
        );
        let ctx = Context::new(vec![vec![u256::ZERO; 256]; 16]).unwrap();
        assert_eq!(ctx.cell(15, 255), Some(u256::ZERO));
        assert_eq!(ctx.cell(15, 256), None);
        assert_eq!(ctx.cell(16, 0), None);
    }

    #[test]
    fn builder_layout() {
        let ctx = ContextBuilder::new(&accept_all, addr(1), addr(2))
            .with_column(vec![u256::from(7u64)])
            .build(&[])
            .unwrap();
        assert_eq!(ctx.width(), 2);
        assert_eq!(ctx.cell(0, 0), Some(addr(1).to_word()));
        assert_eq!(ctx.cell(0, 1), Some(addr(2).to_word()));
        assert_eq!(ctx.cell(1, 0), Some(u256::from(7u64)));
    }

    #[test]
    fn signed_columns() {
        let signed = SignedContext {
            signer: addr(9),
            signature: vec![1, 2, 3],
            context: vec![u256::from(5u64), u256::from(6u64)],
        };
        let ctx = ContextBuilder::new(&accept_all, addr(1), addr(2))
            .with_column(vec![])
            .build(&[signed.clone(), signed.clone()])
            .unwrap();
        assert_eq!(ctx.width(), 5);
        assert_eq!(ctx.column(2), Some(&[addr(9).to_word(), addr(9).to_word()][..]));
        assert_eq!(ctx.cell(4, 1), Some(u256::from(6u64)));
    }

    #[test]
    fn rejected_signature() {
        let signed = SignedContext {
            signer: addr(9),
            signature: vec![],
            context: vec![],
        };
        let reject = |signer: &Address, _: &[u8; 32], _: &[u8]| *signer != addr(9);
        let err = ContextBuilder::new(&reject, addr(1), addr(2))
            .build(&[signed])
            .unwrap_err();
        assert_eq!(err, ContextError::InvalidSignature(0, addr(9)));
    }

    #[test]
    fn hash_commits_to_words() {
        let a = message_hash(&[u256::ONE]);
        let b = message_hash(&[u256::from(2u64)]);
        assert_ne!(a, b);
        assert_eq!(a, message_hash(&[u256::ONE]));
    }
}
