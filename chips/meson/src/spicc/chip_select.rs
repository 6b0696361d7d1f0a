// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Chip select routing.
//!
//! A device is selected through, in order of preference:
//!
//! 1. its own GPIO line,
//! 2. the GPIO the controller assigns to its chip-select channel,
//! 3. the controller's SS output, steered to that channel in CONREG.
//!
//! Devices flagged `no_cs` are never selected at all.

use kernel::hil::gpio::GpioLines;
use kernel::hil::spi::{cs, ConfigError, SpiDevice};

use super::config::SpiccConfig;
use super::registers::{SpiccRegisters, CONREG, MAX_INTERNAL_CS};

const CS_LABEL: &str = "spicc_cs";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CsRoute {
    None,
    DeviceGpio(u32),
    TableGpio(u32),
    Internal(u8),
}

/// Work out how `device` is selected on a controller configured by `config`.
pub fn route(device: &SpiDevice, config: &SpiccConfig) -> Result<CsRoute, ConfigError> {
    if device.no_cs {
        return Ok(CsRoute::None);
    }
    if let Some(line) = device.cs_gpio {
        return Ok(CsRoute::DeviceGpio(line));
    }
    if device.chip_select >= config.num_chip_selects {
        return Err(ConfigError::InvalidChipSelect {
            cs: device.chip_select,
            num: config.num_chip_selects,
        });
    }
    match config.cs_gpio(device.chip_select) {
        Some(line) => Ok(CsRoute::TableGpio(line)),
        None if device.chip_select >= MAX_INTERNAL_CS => Err(ConfigError::InvalidChipSelect {
            cs: device.chip_select,
            num: MAX_INTERNAL_CS,
        }),
        None => Ok(CsRoute::Internal(device.chip_select)),
    }
}

/// GPIO select lines a controller has reserved.
pub struct SelectLines<H> {
    held: Vec<(u32, H)>,
}

impl<H> SelectLines<H> {
    pub fn new() -> SelectLines<H> {
        SelectLines { held: Vec::new() }
    }

    pub fn is_held(&self, line: u32) -> bool {
        self.held.iter().any(|(l, _)| *l == line)
    }

    /// Reserve `line` if it is not held yet and drive it to `level`.
    pub fn claim<G: GpioLines<Handle = H>>(
        &mut self,
        gpio: &G,
        line: u32,
        level: bool,
    ) -> Result<(), ConfigError> {
        if !self.is_held(line) {
            let handle = gpio
                .request(line, CS_LABEL)
                .map_err(|code| ConfigError::GpioUnavailable { line, code })?;
            self.held.push((line, handle));
        }
        self.drive(gpio, line, level)
    }

    /// Drive a held line. Lines not reserved yet are reserved first.
    pub fn drive<G: GpioLines<Handle = H>>(
        &mut self,
        gpio: &G,
        line: u32,
        level: bool,
    ) -> Result<(), ConfigError> {
        match self.held.iter().find(|(l, _)| *l == line) {
            Some((_, handle)) => {
                gpio.drive(handle, level);
                Ok(())
            }
            None => self.claim(gpio, line, level),
        }
    }

    /// Float and give back every line.
    pub fn release_all<G: GpioLines<Handle = H>>(&mut self, gpio: &G) {
        for (_, handle) in self.held.drain(..) {
            gpio.make_input(&handle);
            gpio.release(handle);
        }
    }
}

impl<H> Default for SelectLines<H> {
    fn default() -> Self {
        SelectLines::new()
    }
}

/// Select (`active`) or release `device` over `route`.
pub fn assert<R: SpiccRegisters, G: GpioLines>(
    regs: &R,
    gpio: &G,
    lines: &mut SelectLines<G::Handle>,
    route: CsRoute,
    device: &SpiDevice,
    active: bool,
) -> Result<(), ConfigError> {
    match route {
        CsRoute::None => Ok(()),
        CsRoute::DeviceGpio(line) | CsRoute::TableGpio(line) => {
            lines.drive(gpio, line, device.cs_polarity.level(active))
        }
        CsRoute::Internal(channel) => {
            // The SS output is driven by the block itself around each burst,
            // so selecting and releasing program the same thing.
            let active_high = device.cs_polarity == cs::Polarity::High;
            regs.modify_conreg(
                CONREG::CHIP_SELECT.val(u32::from(channel))
                    + CONREG::SS_POL.val(u32::from(active_high))
                    + CONREG::SS_CTL.val(u32::from(active_high)),
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spicc::fake::{Event, FakeBoard};
    use crate::spicc::SpiccBoard;
    use kernel::ErrorCode;

    fn table_config() -> SpiccConfig {
        SpiccConfig::DEFAULT
            .with_num_chip_selects(3)
            .with_cs_gpios(vec![Some(40), None, Some(42)])
    }

    #[test]
    fn route_priority() {
        let config = table_config();
        let dev = SpiDevice::new(0, 1_000_000);
        assert_eq!(
            route(&dev.clone().with_cs_gpio(7), &config),
            Ok(CsRoute::DeviceGpio(7))
        );
        assert_eq!(route(&dev, &config), Ok(CsRoute::TableGpio(40)));
        assert_eq!(
            route(&SpiDevice::new(1, 1_000_000), &config),
            Ok(CsRoute::Internal(1))
        );
        assert_eq!(
            route(&dev.clone().with_cs_gpio(7).without_chip_select(), &config),
            Ok(CsRoute::None)
        );
    }

    #[test]
    fn out_of_range_channel_rejected() {
        let config = table_config();
        assert_eq!(
            route(&SpiDevice::new(3, 1_000_000), &config),
            Err(ConfigError::InvalidChipSelect { cs: 3, num: 3 })
        );
        // A dedicated line makes the channel irrelevant.
        assert_eq!(
            route(&SpiDevice::new(9, 1_000_000).with_cs_gpio(5), &config),
            Ok(CsRoute::DeviceGpio(5))
        );
    }

    #[test]
    fn internal_channels_stop_at_four() {
        let config = SpiccConfig::DEFAULT
            .with_num_chip_selects(6)
            .with_cs_gpios(vec![None, None, None, None, Some(44)]);
        assert_eq!(
            route(&SpiDevice::new(3, 1_000_000), &config),
            Ok(CsRoute::Internal(3))
        );
        // Channel 4 has a table line, channel 5 would need a fifth SS output.
        assert_eq!(
            route(&SpiDevice::new(4, 1_000_000), &config),
            Ok(CsRoute::TableGpio(44))
        );
        assert_eq!(
            route(&SpiDevice::new(5, 1_000_000), &config),
            Err(ConfigError::InvalidChipSelect {
                cs: 5,
                num: MAX_INTERNAL_CS
            })
        );
    }

    #[test]
    fn gpio_levels_follow_polarity() {
        let board = FakeBoard::new();
        let mut lines = SelectLines::new();
        let low = SpiDevice::new(0, 1_000_000).with_cs_gpio(7);
        let high = SpiDevice::new(0, 1_000_000)
            .with_cs_gpio(8)
            .with_cs_polarity(cs::Polarity::High);

        for dev in [&low, &high] {
            let r = route(dev, &SpiccConfig::DEFAULT).unwrap();
            assert!(assert(board.registers(), board.gpio(), &mut lines, r, dev, true).is_ok());
            assert!(assert(board.registers(), board.gpio(), &mut lines, r, dev, false).is_ok());
        }

        assert_eq!(
            board.events(),
            vec![
                Event::Request(7),
                Event::Cs { line: 7, high: false },
                Event::Cs { line: 7, high: true },
                Event::Request(8),
                Event::Cs { line: 8, high: true },
                Event::Cs { line: 8, high: false },
            ]
        );
    }

    #[test]
    fn internal_channel_programs_conreg() {
        let board = FakeBoard::new();
        let mut lines = SelectLines::new();
        let dev = SpiDevice::new(2, 1_000_000).with_cs_polarity(cs::Polarity::High);
        assert_eq!(
            assert(
                board.registers(),
                board.gpio(),
                &mut lines,
                CsRoute::Internal(2),
                &dev,
                true
            ),
            Ok(())
        );
        let conreg = board.conreg_copy();
        assert_eq!(conreg.read(CONREG::CHIP_SELECT), 2);
        assert!(conreg.is_set(CONREG::SS_POL));
        assert!(conreg.is_set(CONREG::SS_CTL));
        assert!(board.events().is_empty());
    }

    #[test]
    fn unavailable_line_is_reported() {
        let board = FakeBoard::new();
        board.remove_line(7);
        let mut lines = SelectLines::new();
        assert_eq!(
            lines.claim(board.gpio(), 7, true),
            Err(ConfigError::GpioUnavailable {
                line: 7,
                code: ErrorCode::NODEVICE
            })
        );
        assert!(!lines.is_held(7));
    }

    #[test]
    fn release_floats_lines() {
        let board = FakeBoard::new();
        let mut lines = SelectLines::new();
        assert_eq!(lines.claim(board.gpio(), 3, true), Ok(()));
        lines.release_all(board.gpio());
        assert!(board.held_lines().is_empty());
        assert_eq!(
            &board.events()[2..],
            &[Event::Input(3), Event::Release(3)]
        );
    }
}
