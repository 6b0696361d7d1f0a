// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Interfaces for GPIO lines borrowed by peripheral drivers.

use crate::ErrorCode;

/// Enum for configuring any pull-up or pull-down resistors on the GPIO pin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FloatingState {
    PullUp,
    PullDown,
    PullNone,
}

/// Numbered GPIO lines that a driver must reserve before driving.
///
/// A driver requests a line once, drives it through the returned handle for
/// as long as it owns it, and gives it back with `release`.
pub trait GpioLines {
    type Handle;

    /// Reserve `line` for the caller. `label` names the owner for debugging.
    ///
    /// ### Return values
    ///
    /// - `Ok(handle)`: the line is reserved and configured as an output
    /// - `Err(BUSY)`: another owner holds the line
    /// - `Err(NODEVICE)`: no such line
    fn request(&self, line: u32, label: &'static str) -> Result<Self::Handle, ErrorCode>;

    /// Drive the line high (`true`) or low (`false`).
    fn drive(&self, handle: &Self::Handle, high: bool);

    /// Stop driving the line and leave it as a floating input.
    fn make_input(&self, handle: &Self::Handle);

    /// Give the line back.
    fn release(&self, handle: Self::Handle);
}

/// Pull resistor control for pads the driver does not otherwise own.
pub trait PullControl {
    fn set_floating_state(&self, pin: u32, state: FloatingState);
}
