// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! SCLK divider selection.
//!
//! The SPICC derives SCLK from its source clock by a power of two: divider
//! code `d` gives `source >> (d + 2)`, so code 0 runs at a quarter of the
//! source and code 7 at 1/512.

/// Slowest divider code.
pub const MAX_DIVIDER: u32 = 7;

/// A divider code and the bit rate it produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClockSetting {
    pub divider: u32,
    pub rate_hz: u32,
}

/// Bit rate produced by `divider` from a `source_hz` clock. Codes above
/// [`MAX_DIVIDER`] are clamped.
pub const fn rate_for(source_hz: u32, divider: u32) -> u32 {
    let divider = if divider > MAX_DIVIDER {
        MAX_DIVIDER
    } else {
        divider
    };
    source_hz >> (divider + 2)
}

/// Pick the fastest divider whose rate does not exceed `requested_hz`.
///
/// Requests at or above the code 0 rate get code 0. Requests below the
/// slowest rate are clamped to code 7 and so run faster than asked.
pub fn compute(source_hz: u32, requested_hz: u32) -> ClockSetting {
    let mut divider = 0;
    while divider < MAX_DIVIDER && rate_for(source_hz, divider) > requested_hz {
        divider += 1;
    }
    ClockSetting {
        divider,
        rate_hz: rate_for(source_hz, divider),
    }
}
