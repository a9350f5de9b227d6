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

//! Fixed-point decimal arithmetic over 256-bit machine words.
//!
//! Values are unsigned integers interpreted as decimals with a given number of digits after the
//! point; canonical precision is 18 decimals. All operations round towards zero.

use amplify::num::{u256, u512};

/// Canonical number of decimals of fixed-point values.
pub const FP_DECIMALS: u8 = 18;

/// Maximal power of ten fitting into 256 bits.
pub const POW10_MAX: u8 = 77;

/// Arithmetic errors of fixed-point and integer word operations.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display(doc_comments)]
pub enum MathError {
    /// arithmetic overflow.
    Overflow,

    /// arithmetic underflow.
    Underflow,

    /// division by zero.
    DivisionByZero,
}

/// Returns `10^exp`.
pub fn pow10(exp: u8) -> Result<u256, MathError> {
    if exp > POW10_MAX {
        return Err(MathError::Overflow);
    }
    let ten = u256::from(10u64);
    let mut acc = u256::ONE;
    for _ in 0..exp {
        acc = acc.checked_mul(ten).ok_or(MathError::Overflow)?;
    }
    Ok(acc)
}

/// Returns fixed-point one (`10^18`).
#[inline]
pub fn fp_one() -> u256 { u256::from(1_000_000_000_000_000_000u64) }

fn pow_with(base: u256, exp: u256, mul: impl Fn(u256, u256) -> Option<u256>) -> Option<u256> {
    let bits = exp.to_le_bytes();
    let Some(top) = (0..256usize).rev().find(|&i| bits[i / 8] >> (i % 8) & 1 == 1) else {
        return Some(u256::ONE);
    };
    let mut acc = u256::ONE;
    let mut square = base;
    for i in 0..=top {
        if bits[i / 8] >> (i % 8) & 1 == 1 {
            acc = mul(acc, square)?;
        }
        if i < top {
            square = mul(square, square)?;
        }
    }
    Some(acc)
}

/// Raises `base` to the power of `exp`, failing on overflow.
pub fn checked_pow(base: u256, exp: u256) -> Result<u256, MathError> {
    pow_with(base, exp, |a, b| a.checked_mul(b)).ok_or(MathError::Overflow)
}

/// Raises `base` to the power of `exp` modulo `2^256`.
pub fn wrapping_pow(base: u256, exp: u256) -> u256 {
    pow_with(base, exp, |a, b| Some(a.wrapping_mul(b))).unwrap_or(u256::ZERO)
}

fn widen(val: u256) -> u512 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(&val.to_le_bytes());
    u512::from_le_bytes(buf)
}

/// Computes `a * b / denominator` with a 512-bit intermediate product, rounding down.
pub fn mul_div(a: u256, b: u256, denominator: u256) -> Result<u256, MathError> {
    if denominator == u256::ZERO {
        return Err(MathError::DivisionByZero);
    }
    let product = widen(a).checked_mul(widen(b)).ok_or(MathError::Overflow)?;
    let quotient = (product / widen(denominator)).to_le_bytes();
    if quotient[32..].iter().any(|byte| *byte != 0) {
        return Err(MathError::Overflow);
    }
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&quotient[..32]);
    Ok(u256::from_le_bytes(buf))
}

/// Multiplies two 18-decimal fixed-point values.
#[inline]
pub fn fixed_point_mul(a: u256, b: u256) -> Result<u256, MathError> { mul_div(a, b, fp_one()) }

/// Divides two 18-decimal fixed-point values.
#[inline]
pub fn fixed_point_div(a: u256, b: u256) -> Result<u256, MathError> { mul_div(a, fp_one(), b) }

/// Multiplies (positive scale) or divides (negative scale) a value by `10^|scale|`.
pub fn scale_by(a: u256, scale: i8) -> Result<u256, MathError> {
    let factor = pow10(scale.unsigned_abs())?;
    if scale >= 0 {
        a.checked_mul(factor).ok_or(MathError::Overflow)
    } else {
        Ok(a / factor)
    }
}

/// Rescales value with `decimals` digits after the point into an 18-decimal value.
pub fn scale18(a: u256, decimals: u8) -> Result<u256, MathError> {
    if decimals > FP_DECIMALS {
        Ok(a / pow10(decimals - FP_DECIMALS)?)
    } else {
        a.checked_mul(pow10(FP_DECIMALS - decimals)?).ok_or(MathError::Overflow)
    }
}

/// Rescales 18-decimal value into a value with `decimals` digits after the point.
pub fn scale_n(a: u256, decimals: u8) -> Result<u256, MathError> {
    if decimals < FP_DECIMALS {
        Ok(a / pow10(FP_DECIMALS - decimals)?)
    } else {
        a.checked_mul(pow10(decimals - FP_DECIMALS)?).ok_or(MathError::Overflow)
    }
}

/// Rescales 18-decimal value into a value with `decimals` digits after the point, saturating at
/// the maximal word value instead of overflowing.
pub fn scale_n_saturating(a: u256, decimals: u8) -> u256 {
    if decimals < FP_DECIMALS {
        return scale_n(a, decimals).unwrap_or(u256::ZERO);
    }
    match pow10(decimals - FP_DECIMALS) {
        Ok(factor) => a.saturating_mul(factor),
        Err(_) if a == u256::ZERO => u256::ZERO,
        Err(_) => u256::MAX,
    }
}

/// Rescales an 18-decimal ratio of output to input token amounts into a ratio of raw token
/// amounts: multiplies by `10^(input_decimals - output_decimals)`.
pub fn scale_ratio(ratio: u256, output_decimals: u8, input_decimals: u8) -> Result<u256, MathError> {
    let scale = input_decimals as i16 - output_decimals as i16;
    let scale = i8::try_from(scale).map_err(|_| MathError::Overflow)?;
    scale_by(ratio, scale)
}
