// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! The part of the controller that owns the hardware.
//!
//! An [`Engine`] holds the board, the delay source and the bookkeeping of
//! what the registers are currently programmed for. It lives behind the
//! controller's lock and is only ever driven by the worker thread or, while
//! holding that lock, by the diagnostic path.

use embedded_hal::delay::DelayNs;
use kernel::hil::clock::SourceClock;
use kernel::hil::spi::{ConfigError, Message, SpiDevice, SpiError, SpiMode, WordSize};
use kernel::ClockInterface;
use log::{debug, error, info, warn};

use super::board::SpiccBoard;
use super::chip_select::{self, CsRoute, SelectLines};
use super::clock::{self, ClockSetting};
use super::config::SpiccConfig;
use super::mode;
use super::registers::{SpiccReg, SpiccRegisters, CONREG, TESTREG};
use super::xfer::TransferEngine;

/// What the registers are currently programmed for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerState {
    /// Last requested bit rate. The achieved rate may be lower.
    pub speed_hz: u32,
    pub mode: SpiMode,
    pub word: WordSize,
    /// Device the last message was for.
    pub active: Option<SpiDevice>,
}

impl ControllerState {
    const RESET: ControllerState = ControllerState {
        speed_hz: 0,
        mode: SpiMode::MODE_0,
        word: WordSize::Bits8,
        active: None,
    };

    /// Whether the registers already suit `device`.
    pub fn matches(&self, device: &SpiDevice, word: WordSize) -> bool {
        self.speed_hz == device.max_speed_hz && self.mode == device.mode && self.word == word
    }
}

pub(crate) struct Engine<B: SpiccBoard, D: DelayNs> {
    pub(super) board: B,
    pub(super) delay: D,
    pub(super) config: SpiccConfig,
    pub(super) name: String,
    pub(super) state: ControllerState,
    pub(super) lines: SelectLines<B::CsHandle>,
    attached: bool,
}

impl<B: SpiccBoard, D: DelayNs> Engine<B, D> {
    pub(crate) fn new(board: B, delay: D, config: SpiccConfig) -> Engine<B, D> {
        Engine {
            board,
            delay,
            name: config.name(),
            config,
            state: ControllerState::RESET,
            lines: SelectLines::new(),
            attached: false,
        }
    }

    pub(crate) fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Bring the block into a known idle state: master, PIO start, 8-bit
    /// words, mode 0 at the default rate, SS active low. Every chip-select
    /// GPIO in the controller table is reserved and driven high.
    pub(crate) fn hw_init(&mut self) -> Result<(), ConfigError> {
        for cs in 0..self.config.num_chip_selects {
            if let Some(line) = self.config.cs_gpio(cs) {
                if let Err(e) = self.lines.claim(self.board.gpio(), line, true) {
                    error!("{}: chip select {} gpio {}: {}", self.name, cs, line, e);
                    self.lines.release_all(self.board.gpio());
                    return Err(e);
                }
            }
        }

        self.board.clock_gate().enable();
        self.delay.delay_us(self.config.gate_settle_us);

        let regs = self.board.registers();
        regs.modify_testreg(TESTREG::CLK_FREE_EN::SET);
        regs.modify_conreg(
            CONREG::EN::CLEAR + CONREG::MODE::Master + CONREG::XCH::CLEAR + CONREG::SMC::Pio,
        );
        // Polled operation only.
        regs.write(SpiccReg::IntReg, 0);
        regs.write(SpiccReg::DmaReg, 0);

        self.program(self.config.default_speed_hz, SpiMode::MODE_0, WordSize::Bits8);

        let regs = self.board.registers();
        regs.modify_conreg(CONREG::SS_CTL::SET + CONREG::SS_POL::CLEAR);
        regs.dump(&self.name);

        self.board.clock_gate().disable();
        self.attached = true;
        Ok(())
    }

    /// Check `device` and, if the registers are set up for something else,
    /// reprogram them. Nothing is changed when the device is rejected.
    pub(crate) fn configure(&mut self, device: &SpiDevice) -> Result<(), ConfigError> {
        let word = device
            .word_size()
            .inspect_err(|e| error!("{}: setup: {}", self.name, e))?;
        let route = chip_select::route(device, &self.config)
            .inspect_err(|e| error!("{}: setup: {}", self.name, e))?;
        if let CsRoute::DeviceGpio(line) = route {
            if !self.lines.is_held(line) {
                self.lines
                    .claim(self.board.gpio(), line, device.cs_polarity.level(false))?;
            }
        }

        if !self.state.matches(device, word) {
            self.board.clock_gate().enable();
            self.delay.delay_us(self.config.gate_settle_us);
            self.board.registers().set_enabled(false);
            self.program(device.max_speed_hz, device.mode, word);
            self.board.clock_gate().disable();
            info!(
                "{}: setup: bits_per_word = {}, max_speed_hz = {}, chip_select = {}, mode = {:#04x}",
                self.name,
                device.bits_per_word,
                device.max_speed_hz,
                device.chip_select,
                device.mode.bits()
            );
        }
        Ok(())
    }

    /// Run every transfer of `message` with its device selected.
    ///
    /// Stops at the first failing transfer. Whatever happens, the block is
    /// left disabled, the device deselected and the clock gated.
    pub(crate) fn process(&mut self, message: &mut Message) -> Result<(), SpiError> {
        let device = message.device.clone();
        let word = device.word_size()?;
        let route = chip_select::route(&device, &self.config)?;
        for transfer in &message.transfers {
            transfer.validate(word)?;
        }

        self.board.clock_gate().enable();
        if self.state.active.as_ref() != Some(&device) || !self.state.matches(&device, word) {
            self.program(device.max_speed_hz, device.mode, word);
            self.state.active = Some(device.clone());
        }

        let mut result = self.select(route, &device, true);
        if result.is_ok() {
            self.board.registers().set_enabled(true);
            result = self.run_transfers(&device, message);
        }

        self.board.registers().set_enabled(false);
        if let Err(e) = self.select(route, &device, false) {
            warn!("{}: deselect: {}", self.name, e);
        }
        self.board.clock_gate().disable();
        result
    }

    fn run_transfers(&mut self, device: &SpiDevice, message: &mut Message) -> Result<(), SpiError> {
        for transfer in message.transfers.iter_mut() {
            let speed_hz = transfer
                .speed_override(device.max_speed_hz)
                .unwrap_or(device.max_speed_hz);
            if speed_hz != self.state.speed_hz {
                self.reclock(speed_hz);
            }

            let len = transfer.len;
            TransferEngine::new(self.board.registers(), &mut self.delay, &self.config).execute(
                transfer.tx_buf.as_deref(),
                transfer.rx_buf.as_deref_mut(),
                len,
            )?;
            message.actual_length += len;

            if transfer.delay_usecs > 0 {
                self.delay.delay_us(transfer.delay_usecs);
            }
        }
        Ok(())
    }

    fn select(&mut self, route: CsRoute, device: &SpiDevice, active: bool) -> Result<(), SpiError> {
        chip_select::assert(
            self.board.registers(),
            self.board.gpio(),
            &mut self.lines,
            route,
            device,
            active,
        )
        .map_err(SpiError::from)
    }

    /// Program rate, mode and word width. The block must be disabled.
    pub(super) fn program(&mut self, speed_hz: u32, mode: SpiMode, word: WordSize) {
        debug_assert!(!self.board.registers().enabled());
        self.set_clk(speed_hz);
        mode::apply(
            self.board.registers(),
            self.board.pins(),
            &self.config,
            mode,
        );
        mode::set_bits_per_word(self.board.registers(), word);
        self.state.mode = mode;
        self.state.word = word;
    }

    /// Change the rate mid-message, pausing the block around the change.
    fn reclock(&mut self, speed_hz: u32) {
        let was_enabled = self.board.registers().enabled();
        self.board.registers().set_enabled(false);
        self.set_clk(speed_hz);
        if was_enabled {
            self.board.registers().set_enabled(true);
        }
    }

    pub(super) fn set_clk(&mut self, speed_hz: u32) -> ClockSetting {
        let setting = clock::compute(self.board.source_clock().frequency(), speed_hz);
        self.board
            .registers()
            .modify_conreg(CONREG::DATA_RATE_DIV.val(setting.divider));
        self.state.speed_hz = speed_hz;
        debug!(
            "{}: sclk {} Hz (divider {}) for {} Hz",
            self.name, setting.rate_hz, setting.divider, speed_hz
        );
        setting
    }

    /// Disable the block and give back every select line. Idempotent.
    pub(crate) fn shutdown(&mut self) {
        if !self.attached {
            return;
        }
        self.board.registers().set_enabled(false);
        self.lines.release_all(self.board.gpio());
        if self.board.clock_gate().is_enabled() {
            self.board.clock_gate().disable();
        }
        self.attached = false;
        info!("{}: detached", self.name);
    }
}
