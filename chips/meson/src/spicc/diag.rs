// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Bring-up diagnostics.
//!
//! Lets a board exchange a few bytes with whatever sits on the bus without a
//! device driver, selecting it through an arbitrary GPIO line. The command
//! format is the one line of text a console or debug endpoint would hand
//! over:
//!
//! ```text
//! cs_gpio speed mode num [wdata1 wdata2 wdata3 wdata4]
//! ```
//!
//! with decimal header fields and hexadecimal data bytes. Anything starting
//! with `h` asks for [`HELP`].

use core::str::FromStr;

use embedded_hal::delay::DelayNs;
use kernel::hil::gpio::GpioLines;
use kernel::hil::spi::{ConfigError, SpiError, SpiMode};
use kernel::ClockInterface;
use log::{info, warn};
use thiserror::Error;

use super::board::SpiccBoard;
use super::controller::Engine;
use super::mode;
use super::registers::SpiccRegisters;
use super::xfer::TransferEngine;

pub const HELP: &str = "SPI device test help\n\
You can test the SPI device even without its driver through this command\n\
cs_gpio speed mode num [wdata1 wdata2 wdata3 wdata4]\n";

/// Most data bytes one command can carry.
pub const MAX_DATA: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagCommand {
    Help,
    Exchange(DiagRequest),
}

/// One test exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagRequest {
    /// GPIO line used as chip select, driven low for the exchange.
    pub cs_gpio: u32,
    pub speed_hz: u32,
    pub mode: SpiMode,
    /// Bytes to send. As many come back.
    pub data: Vec<u8>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum DiagParseError {
    #[error("invalid data: {parsed} fields parsed, {needed} needed")]
    Incomplete { parsed: usize, needed: usize },
    #[error("invalid data: no chip select gpio")]
    NoChipSelect,
    #[error("invalid data: no speed")]
    NoSpeed,
    #[error("invalid data: {0} bytes requested, at most 4")]
    TooLong(usize),
}

fn parse_hex_byte(field: &str) -> Option<u8> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .unwrap_or(field);
    u32::from_str_radix(digits, 16).ok().map(|v| v as u8)
}

impl DiagCommand {
    pub fn parse(input: &str) -> Result<DiagCommand, DiagParseError> {
        if input.starts_with('h') {
            return Ok(DiagCommand::Help);
        }

        // Fields are consumed left to right and parsing stops at the first
        // one that does not convert.
        let mut fields = input.split_ascii_whitespace();
        let mut header = [0u32; 4];
        let mut parsed = 0;
        for slot in header.iter_mut() {
            match fields.next().and_then(|f| f.parse().ok()) {
                Some(value) => {
                    *slot = value;
                    parsed += 1;
                }
                None => break,
            }
        }
        let mut data = [0u8; MAX_DATA];
        if parsed == header.len() {
            for slot in data.iter_mut() {
                match fields.next().and_then(parse_hex_byte) {
                    Some(value) => {
                        *slot = value;
                        parsed += 1;
                    }
                    None => break,
                }
            }
        }

        let [cs_gpio, speed_hz, mode, num] = header;
        let num = num as usize;
        if num > MAX_DATA {
            return Err(DiagParseError::TooLong(num));
        }
        if parsed < num + header.len() {
            return Err(DiagParseError::Incomplete {
                parsed,
                needed: num + header.len(),
            });
        }
        if cs_gpio == 0 {
            return Err(DiagParseError::NoChipSelect);
        }
        if speed_hz == 0 {
            return Err(DiagParseError::NoSpeed);
        }

        Ok(DiagCommand::Exchange(DiagRequest {
            cs_gpio,
            speed_hz,
            mode: SpiMode::from_bits(mode as u8),
            data: data[..num].to_vec(),
        }))
    }
}

impl FromStr for DiagCommand {
    type Err = DiagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiagCommand::parse(s)
    }
}

impl<B: SpiccBoard, D: DelayNs> Engine<B, D> {
    /// Run one test exchange and return what came back.
    pub(crate) fn diagnose(&mut self, request: &DiagRequest) -> Result<Vec<u8>, SpiError> {
        info!(
            "{}: test cs_gpio={}, speed={}, mode={}, num={}",
            self.name,
            request.cs_gpio,
            request.speed_hz,
            request.mode.bits(),
            request.data.len()
        );
        let len = request.data.len();
        let word_bytes = self.state.word.bytes();
        if len % word_bytes != 0 {
            return Err(ConfigError::MisalignedLength { len, word_bytes }.into());
        }

        // A line from the controller's own chip-select table is already
        // held. It is borrowed for the exchange and left driven high.
        let line = request.cs_gpio;
        let handle = if self.lines.is_held(line) {
            self.lines.drive(self.board.gpio(), line, false)?;
            None
        } else {
            let handle = self
                .board
                .gpio()
                .request(line, "spicc_cs")
                .map_err(|code| ConfigError::GpioUnavailable { line, code })?;
            self.board.gpio().drive(&handle, false);
            Some(handle)
        };

        self.board.clock_gate().enable();
        self.set_clk(request.speed_hz);
        mode::apply(
            self.board.registers(),
            self.board.pins(),
            &self.config,
            request.mode,
        );
        self.state.mode = request.mode;
        self.board.registers().set_enabled(true);
        self.board.registers().dump(&self.name);

        let mut rx = vec![0; len];
        let result = TransferEngine::new(self.board.registers(), &mut self.delay, &self.config)
            .execute(Some(request.data.as_slice()), Some(rx.as_mut_slice()), len);

        self.board.registers().set_enabled(false);
        self.board.clock_gate().disable();
        match handle {
            Some(handle) => {
                self.board.gpio().make_input(&handle);
                self.board.gpio().release(handle);
            }
            None => {
                if let Err(e) = self.lines.drive(self.board.gpio(), line, true) {
                    warn!("{}: cs gpio {}: {}", self.name, line, e);
                }
            }
        }

        result?;
        info!("{}: read back data: {:02x?}", self.name, rx);
        Ok(rx)
    }
}
