// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Clock mode and word width programming.

use kernel::hil::gpio::{FloatingState, PullControl};
use kernel::hil::spi::{ClockPhase, ClockPolarity, SpiMode, WordSize};
use kernel::utilities::registers::FieldValue;

use super::config::SpiccConfig;
use super::registers::{SpiccRegisters, CONREG};

/// CONREG fields selecting `mode`. The data-ready input is always ignored.
pub fn mode_fields(mode: SpiMode) -> FieldValue<u32, CONREG::Register> {
    let polarity = match mode.polarity {
        ClockPolarity::IdleLow => CONREG::CLK_POL::CLEAR,
        ClockPolarity::IdleHigh => CONREG::CLK_POL::SET,
    };
    let phase = match mode.phase {
        ClockPhase::SampleLeading => CONREG::CLK_PHA::CLEAR,
        ClockPhase::SampleTrailing => CONREG::CLK_PHA::SET,
    };
    polarity + phase + CONREG::DRCTL::Ignore
}

/// Program `mode` and bias the bus pins to match its idle levels: MOSI is
/// pulled down, SCLK follows CPOL.
pub fn apply<R: SpiccRegisters, P: PullControl>(
    regs: &R,
    pins: &P,
    config: &SpiccConfig,
    mode: SpiMode,
) {
    regs.modify_conreg(mode_fields(mode));

    pins.set_floating_state(config.mosi_pin, FloatingState::PullDown);
    let sclk = match mode.polarity {
        ClockPolarity::IdleHigh => FloatingState::PullUp,
        ClockPolarity::IdleLow => FloatingState::PullDown,
    };
    pins.set_floating_state(config.sclk_pin, sclk);
}

pub fn set_bits_per_word<R: SpiccRegisters>(regs: &R, word: WordSize) {
    regs.modify_conreg(CONREG::BITS_PER_WORD.val(word.bits() - 1));
}
