// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! SPICC configuration.
//!
//! Two layers, mirroring the kernel: compile-time switches collected in a
//! `Config` constant that the optimizer can fold away, and a runtime
//! [`SpiccConfig`] passed in when a controller is attached.

/// Compile-time switches for the SPICC driver.
#[derive(Clone, Copy)]
pub(crate) struct Config {
    /// Log every word exchanged with the FIFO at trace level.
    ///
    /// This is very chatty and slows bursts down noticeably, so it is only
    /// compiled in with the `trace_spicc` feature.
    pub(crate) trace_words: bool,
}

pub(crate) const CONFIG: Config = Config {
    trace_words: cfg!(feature = "trace_spicc"),
};

/// Board and timing parameters for one SPICC instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpiccConfig {
    /// Bus number, used for the worker name and log prefixes.
    pub bus_num: u8,
    /// Words the TX and RX FIFOs each hold.
    pub fifo_depth: usize,
    /// Status polls before a FIFO wait gives up.
    pub poll_retries: u32,
    /// Microseconds between status polls.
    pub poll_interval_us: u32,
    /// Divider codes above this get a settling delay before each RX read of a
    /// word wider than 8 bits.
    pub settle_div_threshold: u32,
    /// Fixed part of the settling delay, in microseconds.
    pub settle_base_us: u32,
    /// Bit rate programmed at hardware init.
    pub default_speed_hz: u32,
    /// Wait after ungating the peripheral clock at init.
    pub gate_settle_us: u32,
    /// Pad of the MOSI line, for the bias hint.
    pub mosi_pin: u32,
    /// Pad of the SCLK line, for the bias hint.
    pub sclk_pin: u32,
    /// Number of chip-select channels on this controller.
    pub num_chip_selects: u8,
    /// Optional GPIO line per chip-select channel. Channels without an entry
    /// use the controller's own SS output.
    pub cs_gpios: Vec<Option<u32>>,
}

impl SpiccConfig {
    pub const DEFAULT: SpiccConfig = SpiccConfig {
        bus_num: 0,
        fifo_depth: 16,
        poll_retries: 100,
        poll_interval_us: 1,
        settle_div_threshold: 5,
        settle_base_us: 10,
        default_speed_hz: 3_000_000,
        gate_settle_us: 10,
        // GPIOX_10 and GPIOX_8.
        mosi_pin: 10,
        sclk_pin: 8,
        num_chip_selects: 4,
        cs_gpios: Vec::new(),
    };

    pub fn with_bus_num(mut self, bus_num: u8) -> SpiccConfig {
        self.bus_num = bus_num;
        self
    }

    /// Use `lines` as the chip-select GPIO table. The channel count grows to
    /// cover the table if needed.
    pub fn with_cs_gpios(mut self, lines: Vec<Option<u32>>) -> SpiccConfig {
        let len = u8::try_from(lines.len()).unwrap_or(u8::MAX);
        self.num_chip_selects = self.num_chip_selects.max(len);
        self.cs_gpios = lines;
        self
    }

    pub fn with_num_chip_selects(mut self, num: u8) -> SpiccConfig {
        self.num_chip_selects = num;
        self
    }

    /// GPIO line for chip-select channel `cs`, if the table has one.
    pub fn cs_gpio(&self, cs: u8) -> Option<u32> {
        self.cs_gpios.get(usize::from(cs)).copied().flatten()
    }

    pub(crate) fn name(&self) -> String {
        format!("spicc{}", self.bus_num)
    }
}

impl Default for SpiccConfig {
    fn default() -> Self {
        SpiccConfig::DEFAULT
    }
}
