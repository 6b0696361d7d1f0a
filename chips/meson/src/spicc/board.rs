// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! What a board provides to one SPICC instance.

use kernel::hil::clock::SourceClock;
use kernel::hil::gpio::{GpioLines, PullControl};
use kernel::ClockInterface;

use super::registers::SpiccRegisters;

/// The collaborators of one SPICC controller: its register block, GPIO lines
/// for chip selects, the peripheral clock gate and source clock, and pad bias
/// control.
///
/// The whole bundle moves onto the controller's worker thread, hence `Send`.
pub trait SpiccBoard: Send + 'static {
    type Registers: SpiccRegisters;
    /// Reservation of one GPIO select line.
    type CsHandle: Send + 'static;
    type Gpio: GpioLines<Handle = Self::CsHandle>;
    type Gate: ClockInterface;
    type Source: SourceClock;
    type Pins: PullControl;

    fn registers(&self) -> &Self::Registers;
    fn gpio(&self) -> &Self::Gpio;
    fn clock_gate(&self) -> &Self::Gate;
    fn source_clock(&self) -> &Self::Source;
    fn pins(&self) -> &Self::Pins;
}
