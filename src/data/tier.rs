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

//! Tier reports: 8 tiers of 32-bit timestamps packed into a single word.
//!
//! Tier `N` (`1..=8`) occupies bits `[(N - 1) * 32, N * 32)` and holds the time since which the
//! account holds that tier. Time [`NEVER_TIME`] means the tier was never reached; the all-zero
//! report means every tier is held since the beginning of time.

use alloc::vec::Vec;

use amplify::num::u256;

/// Number of tiers in a report.
pub const TIER_COUNT: u8 = 8;

/// Timestamp value for a tier which was never reached.
pub const NEVER_TIME: u32 = u32::MAX;

/// Report where every tier is held since the beginning of time.
pub const ALWAYS: u256 = u256::ZERO;

/// Report where no tier is ever reached.
pub const NEVER: u256 = u256::MAX;

/// How [`select_lte`] combines timestamps of several reports for a single tier.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, Default)]
#[repr(u8)]
pub enum TierLogic {
    /// All reports must have reached the tier by the reference time.
    #[default]
    #[display("every")]
    Every = 0,

    /// At least one report must have reached the tier by the reference time.
    #[display("any")]
    Any = 1,
}

/// Which of the matching timestamps [`select_lte`] picks for a tier.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, Default)]
#[repr(u8)]
pub enum TierMode {
    /// Earliest matching timestamp.
    #[default]
    #[display("min")]
    Min = 0,

    /// Latest matching timestamp.
    #[display("max")]
    Max = 1,

    /// Timestamp from the first matching report.
    #[display("first")]
    First = 2,
}

impl TierLogic {
    /// Decodes logic from its numeric code.
    pub fn with(code: u8) -> Option<Self> {
        match code {
            0 => Some(TierLogic::Every),
            1 => Some(TierLogic::Any),
            _ => None,
        }
    }
}

impl TierMode {
    /// Decodes mode from its numeric code.
    pub fn with(code: u8) -> Option<Self> {
        match code {
            0 => Some(TierMode::Min),
            1 => Some(TierMode::Max),
            2 => Some(TierMode::First),
            _ => None,
        }
    }
}

#[inline]
fn slot(report: &[u8; 32], index: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&report[index * 4..index * 4 + 4]);
    u32::from_le_bytes(buf)
}

#[inline]
fn set_slot(report: &mut [u8; 32], index: usize, time: u32) {
    report[index * 4..index * 4 + 4].copy_from_slice(&time.to_le_bytes());
}

/// Splits a word into its eight 32-bit parts, lowest first.
pub fn explode32(word: u256) -> [u32; 8] {
    let bytes = word.to_le_bytes();
    let mut parts = [0u32; 8];
    for (index, part) in parts.iter_mut().enumerate() {
        *part = slot(&bytes, index);
    }
    parts
}

/// Returns time since which the report holds the `tier`. Tier zero is always held; tiers above
/// [`TIER_COUNT`] are never reached.
pub fn report_time_for_tier(report: u256, tier: u8) -> u32 {
    match tier {
        0 => 0,
        tier if tier > TIER_COUNT => NEVER_TIME,
        tier => slot(&report.to_le_bytes(), tier as usize - 1),
    }
}

/// Sets time of all tiers above `start_tier` up to and including `end_tier`, i.e. the slots
/// `[start_tier, end_tier)`.
pub fn update_times_for_tier_range(report: u256, start_tier: u8, end_tier: u8, time: u32) -> u256 {
    let mut bytes = report.to_le_bytes();
    for index in start_tier..end_tier.min(TIER_COUNT) {
        set_slot(&mut bytes, index as usize, time);
    }
    u256::from_le_bytes(bytes)
}

/// Tierwise saturating difference of two reports.
pub fn saturating_diff(newer: u256, older: u256) -> u256 {
    let newer = newer.to_le_bytes();
    let older = older.to_le_bytes();
    let mut diff = [0u8; 32];
    for index in 0..TIER_COUNT as usize {
        set_slot(&mut diff, index, slot(&newer, index).saturating_sub(slot(&older, index)));
    }
    u256::from_le_bytes(diff)
}

/// Tierwise selection of timestamps not later than the `reference` time across several reports.
///
/// For each tier collects timestamps `<= reference`; with [`TierLogic::Every`] a single later
/// timestamp makes the tier [`NEVER_TIME`], with [`TierLogic::Any`] one match is enough. If
/// nothing matches the tier is [`NEVER_TIME`]. Among matches the [`TierMode`] picks the result.
pub fn select_lte(reports: &[u256], reference: u32, logic: TierLogic, mode: TierMode) -> u256 {
    let reports = reports.iter().map(|report| report.to_le_bytes()).collect::<Vec<_>>();
    let mut result = [0u8; 32];
    for index in 0..TIER_COUNT as usize {
        let mut selected = None::<u32>;
        for report in &reports {
            let time = slot(report, index);
            if time > reference {
                if logic == TierLogic::Every {
                    selected = None;
                    break;
                }
                continue;
            }
            selected = Some(match (selected, mode) {
                (None, _) => time,
                (Some(prev), TierMode::Min) => prev.min(time),
                (Some(prev), TierMode::Max) => prev.max(time),
                (Some(prev), TierMode::First) => prev,
            });
        }
        set_slot(&mut result, index, selected.unwrap_or(NEVER_TIME));
    }
    u256::from_le_bytes(result)
}

#[cfg(test)]
mod test {
    use super::*;

    fn report(times: [u32; 8]) -> u256 {
        let mut bytes = [0u8; 32];
        for (index, time) in times.iter().enumerate() {
            set_slot(&mut bytes, index, *time);
        }
        u256::from_le_bytes(bytes)
    }

    #[test]
    fn tier_times() {
        let r = report([1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(report_time_for_tier(r, 0), 0);
        assert_eq!(report_time_for_tier(r, 1), 1);
        assert_eq!(report_time_for_tier(r, 8), 8);
        assert_eq!(report_time_for_tier(r, 9), NEVER_TIME);
        assert_eq!(report_time_for_tier(NEVER, 3), NEVER_TIME);
        assert_eq!(report_time_for_tier(ALWAYS, 3), 0);
        assert_eq!(explode32(r), [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn updates() {
        let r = update_times_for_tier_range(NEVER, 0, 3, 100);
        assert_eq!(explode32(r), [100, 100, 100, NEVER_TIME, NEVER_TIME, NEVER_TIME, NEVER_TIME, NEVER_TIME]);
        let r = update_times_for_tier_range(r, 7, 8, 7);
        assert_eq!(report_time_for_tier(r, 8), 7);
        assert_eq!(update_times_for_tier_range(r, 4, 4, 1), r);
    }

    #[test]
    fn diff_saturates() {
        let newer = report([10, 20, 30, 40, 50, 60, 70, 80]);
        let older = report([5, 25, 30, 0, 50, 100, 1, 80]);
        assert_eq!(explode32(saturating_diff(newer, older)), [5, 0, 0, 40, 0, 0, 69, 0]);
    }

    #[test]
    fn select() {
        let a = report([1, 5, 10, 20, 30, 40, 50, 60]);
        let b = report([2, 3, 15, 10, 35, 45, 55, NEVER_TIME]);
        let reports = [a, b];

        let every_min = select_lte(&reports, 30, TierLogic::Every, TierMode::Min);
        assert_eq!(explode32(every_min), [1, 3, 10, 10, NEVER_TIME, NEVER_TIME, NEVER_TIME, NEVER_TIME]);

        let any_max = select_lte(&reports, 30, TierLogic::Any, TierMode::Max);
        assert_eq!(explode32(any_max), [2, 5, 15, 20, 30, NEVER_TIME, NEVER_TIME, NEVER_TIME]);

        let any_first = select_lte(&[b, a], 12, TierLogic::Any, TierMode::First);
        assert_eq!(explode32(any_first), [2, 3, 10, 10, NEVER_TIME, NEVER_TIME, NEVER_TIME, NEVER_TIME]);
    }
}
