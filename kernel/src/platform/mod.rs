// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Interfaces a board provides to chip drivers.

/// Generic operations that clock-like things are expected to support.
///
/// For peripheral bus clock gates, `enable` and `disable` must tolerate being
/// called when the gate is already in the requested state.
pub trait ClockInterface {
    fn is_enabled(&self) -> bool;
    fn enable(&self);
    fn disable(&self);
}
