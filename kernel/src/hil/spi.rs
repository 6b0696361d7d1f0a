// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Interfaces for queued SPI controller (master) communication.
//!
//! A client describes each peripheral chip on the bus with a [`SpiDevice`],
//! has the controller validate it with [`SpiController::setup`], and then
//! submits [`Message`]s: ordered lists of [`Transfer`]s that are exchanged
//! with that chip while its chip select is held active. Submission is
//! asynchronous; the controller hands the message back through its completion
//! callback with the status and the number of bytes actually moved.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use thiserror::Error;

use crate::ErrorCode;

/// Clock polarity (CPOL) defines whether the SPI clock is high or low when
/// idle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockPolarity {
    /// The clock is low when the SPI bus is not active. This is CPOL = 0.
    IdleLow,
    /// The clock is high when the SPI bus is not active. This is CPOL = 1.
    IdleHigh,
}

/// Clock phase (CPHA) defines whether to sample and send data on a leading or
/// trailing clock edge.
///
/// Consult a SPI reference on how CPHA interacts with CPOL.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockPhase {
    /// Sample on the leading clock edge. This is CPHA = 0. If CPOL is 0, then
    /// this samples on the rising edge of the clock. If CPOL is 1, then this
    /// samples on the falling edge of the clock.
    SampleLeading,
    /// Sample on the trailing clock edge. This is CPHA = 1. If CPOL is 0, then
    /// this samples on the falling edge of the clock. If CPOL is 1, then this
    /// samples on the rising edge of the clock.
    SampleTrailing,
}

/// The logical SPI mode: clock polarity plus clock phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpiMode {
    pub polarity: ClockPolarity,
    pub phase: ClockPhase,
}

impl SpiMode {
    pub const MODE_0: SpiMode = SpiMode::new(ClockPolarity::IdleLow, ClockPhase::SampleLeading);
    pub const MODE_1: SpiMode = SpiMode::new(ClockPolarity::IdleLow, ClockPhase::SampleTrailing);
    pub const MODE_2: SpiMode = SpiMode::new(ClockPolarity::IdleHigh, ClockPhase::SampleLeading);
    pub const MODE_3: SpiMode = SpiMode::new(ClockPolarity::IdleHigh, ClockPhase::SampleTrailing);

    /// CPHA flag in the conventional two-bit mode number.
    pub const CPHA: u8 = 0x01;
    /// CPOL flag in the conventional two-bit mode number.
    pub const CPOL: u8 = 0x02;

    pub const fn new(polarity: ClockPolarity, phase: ClockPhase) -> SpiMode {
        SpiMode { polarity, phase }
    }

    /// Decode the conventional mode number (0-3). Bits above CPOL/CPHA are
    /// ignored.
    pub const fn from_bits(bits: u8) -> SpiMode {
        let polarity = if bits & Self::CPOL != 0 {
            ClockPolarity::IdleHigh
        } else {
            ClockPolarity::IdleLow
        };
        let phase = if bits & Self::CPHA != 0 {
            ClockPhase::SampleTrailing
        } else {
            ClockPhase::SampleLeading
        };
        SpiMode { polarity, phase }
    }

    pub const fn bits(&self) -> u8 {
        let mut bits = 0;
        if let ClockPolarity::IdleHigh = self.polarity {
            bits |= Self::CPOL;
        }
        if let ClockPhase::SampleTrailing = self.phase {
            bits |= Self::CPHA;
        }
        bits
    }
}

impl Default for SpiMode {
    fn default() -> Self {
        SpiMode::MODE_0
    }
}

/// Utility types for modeling chip select lines.
pub mod cs {
    /// Represents the Polarity of a chip-select pin (i.e. whether high or low
    /// indicates the peripheral is active).
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum Polarity {
        /// Chip select is active high.
        High,
        /// Chip select is active low.
        Low,
    }

    impl Polarity {
        /// Electrical level for a select line with this polarity.
        ///
        /// Active low lines are driven low when selected and high when
        /// released; active high lines the reverse.
        pub const fn level(self, active: bool) -> bool {
            match self {
                Polarity::High => active,
                Polarity::Low => !active,
            }
        }
    }
}

/// Number of bits moved per FIFO word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WordSize {
    Bits8,
    Bits16,
    Bits32,
}

impl WordSize {
    pub const fn from_bits(bits: u32) -> Option<WordSize> {
        match bits {
            8 => Some(WordSize::Bits8),
            16 => Some(WordSize::Bits16),
            32 => Some(WordSize::Bits32),
            _ => None,
        }
    }

    pub const fn bits(self) -> u32 {
        match self {
            WordSize::Bits8 => 8,
            WordSize::Bits16 => 16,
            WordSize::Bits32 => 32,
        }
    }

    pub const fn bytes(self) -> usize {
        self.bits() as usize / 8
    }
}

/// A peripheral chip on the bus and the bus settings it needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpiDevice {
    /// Controller chip-select index.
    pub chip_select: u8,
    /// Dedicated GPIO select line, taking priority over `chip_select`.
    pub cs_gpio: Option<u32>,
    pub cs_polarity: cs::Polarity,
    /// The chip has no select line at all.
    pub no_cs: bool,
    pub max_speed_hz: u32,
    pub mode: SpiMode,
    pub bits_per_word: u8,
}

impl SpiDevice {
    /// An active-low, mode 0, 8 bits per word device on `chip_select`.
    pub const fn new(chip_select: u8, max_speed_hz: u32) -> SpiDevice {
        SpiDevice {
            chip_select,
            cs_gpio: None,
            cs_polarity: cs::Polarity::Low,
            no_cs: false,
            max_speed_hz,
            mode: SpiMode::MODE_0,
            bits_per_word: 8,
        }
    }

    pub const fn with_mode(mut self, mode: SpiMode) -> SpiDevice {
        self.mode = mode;
        self
    }

    pub const fn with_bits_per_word(mut self, bits: u8) -> SpiDevice {
        self.bits_per_word = bits;
        self
    }

    pub const fn with_cs_gpio(mut self, line: u32) -> SpiDevice {
        self.cs_gpio = Some(line);
        self
    }

    pub const fn with_cs_polarity(mut self, polarity: cs::Polarity) -> SpiDevice {
        self.cs_polarity = polarity;
        self
    }

    pub const fn without_chip_select(mut self) -> SpiDevice {
        self.no_cs = true;
        self
    }

    pub fn word_size(&self) -> Result<WordSize, ConfigError> {
        WordSize::from_bits(u32::from(self.bits_per_word))
            .ok_or(ConfigError::UnsupportedWordSize(self.bits_per_word))
    }
}

/// One contiguous exchange within a [`Message`].
///
/// A missing transmit buffer shifts out zeros; a missing receive buffer
/// discards what is shifted in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transfer {
    pub tx_buf: Option<Vec<u8>>,
    pub rx_buf: Option<Vec<u8>>,
    pub len: usize,
    /// Bit rate for this transfer only. `None` (or zero) uses the device rate.
    pub speed_hz: Option<u32>,
    /// Delay after the transfer completes, before the next one starts.
    pub delay_usecs: u32,
}

impl Transfer {
    /// Transmit `data`, discarding what comes back.
    pub fn write(data: Vec<u8>) -> Transfer {
        Transfer {
            len: data.len(),
            tx_buf: Some(data),
            ..Transfer::default()
        }
    }

    /// Shift out `len` zero bytes and capture the reply.
    pub fn read(len: usize) -> Transfer {
        Transfer {
            rx_buf: Some(vec![0; len]),
            len,
            ..Transfer::default()
        }
    }

    /// Transmit `data` and capture the same number of bytes.
    pub fn duplex(data: Vec<u8>) -> Transfer {
        let len = data.len();
        Transfer {
            tx_buf: Some(data),
            rx_buf: Some(vec![0; len]),
            len,
            ..Transfer::default()
        }
    }

    pub fn with_speed(mut self, speed_hz: u32) -> Transfer {
        self.speed_hz = Some(speed_hz);
        self
    }

    pub fn with_delay_usecs(mut self, delay_usecs: u32) -> Transfer {
        self.delay_usecs = delay_usecs;
        self
    }

    /// The rate override, if one is set and differs from `nominal_hz`.
    pub fn speed_override(&self, nominal_hz: u32) -> Option<u32> {
        self.speed_hz.filter(|&hz| hz != 0 && hz != nominal_hz)
    }

    /// Check that this transfer can be moved in whole `word` sized units.
    pub fn validate(&self, word: WordSize) -> Result<(), ConfigError> {
        if self.len % word.bytes() != 0 {
            return Err(ConfigError::MisalignedLength {
                len: self.len,
                word_bytes: word.bytes(),
            });
        }
        for buf in [&self.tx_buf, &self.rx_buf].into_iter().flatten() {
            if buf.len() < self.len {
                return Err(ConfigError::BufferTooShort {
                    len: self.len,
                    available: buf.len(),
                });
            }
        }
        Ok(())
    }
}

/// Which FIFO status condition a poll was waiting for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FifoFlag {
    TxEmpty,
    RxReady,
}

impl fmt::Display for FifoFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FifoFlag::TxEmpty => f.write_str("tx_empty"),
            FifoFlag::RxReady => f.write_str("rx_ready"),
        }
    }
}

/// A device or transfer description the controller cannot honor. Reported
/// before any register is touched.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} bits/word not supported")]
    UnsupportedWordSize(u8),
    #[error("chip select {cs} out of range, controller has {num}")]
    InvalidChipSelect { cs: u8, num: u8 },
    #[error("length {len} is not a multiple of {word_bytes}-byte words")]
    MisalignedLength { len: usize, word_bytes: usize },
    #[error("length {len} exceeds {available}-byte buffer")]
    BufferTooShort { len: usize, available: usize },
    #[error("chip select gpio {line} unavailable: {code}")]
    GpioUnavailable { line: u32, code: ErrorCode },
}

/// A failure while exchanging words with the FIFO.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("{0} timeout")]
    Timeout(FifoFlag),
    #[error("unsupported bits/word {0}")]
    UnsupportedWordSize(u32),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum SpiError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    /// The controller has no worker left to run the message.
    #[error("controller detached")]
    Detached,
    /// A synchronous transfer was started on the controller's own worker,
    /// from a completion callback.
    #[error("synchronous transfer from a completion callback")]
    Reentrant,
}

/// Outcome of a message as seen by its completion callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageStatus {
    InProgress,
    Complete,
    Failed(SpiError),
}

/// Where a message is in its single pass through a controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageState {
    /// Built but not submitted yet.
    Idle,
    Queued,
    Active,
    Completed,
}

/// Called exactly once when the controller is done with a message.
pub type Completion = Box<dyn FnOnce(Message) + Send + 'static>;

/// An ordered sequence of transfers targeting one device.
pub struct Message {
    pub device: SpiDevice,
    pub transfers: Vec<Transfer>,
    /// Bytes moved by the transfers that completed.
    pub actual_length: usize,
    pub status: MessageStatus,
    state: MessageState,
    complete: Option<Completion>,
}

impl Message {
    pub fn new(device: SpiDevice, transfers: Vec<Transfer>) -> Message {
        Message {
            device,
            transfers,
            actual_length: 0,
            status: MessageStatus::InProgress,
            state: MessageState::Idle,
            complete: None,
        }
    }

    /// Set the completion callback.
    pub fn on_complete<F>(mut self, complete: F) -> Message
    where
        F: FnOnce(Message) + Send + 'static,
    {
        self.complete = Some(Box::new(complete));
        self
    }

    pub fn state(&self) -> MessageState {
        self.state
    }

    /// Reset the bookkeeping for a fresh pass and mark the message queued.
    pub fn enqueue(&mut self) {
        self.actual_length = 0;
        self.status = MessageStatus::InProgress;
        self.state = MessageState::Queued;
    }

    pub fn activate(&mut self) {
        self.state = MessageState::Active;
    }

    /// Record the final status and hand the message to its callback.
    pub fn complete(mut self, result: Result<(), SpiError>) {
        self.status = match result {
            Ok(()) => MessageStatus::Complete,
            Err(e) => MessageStatus::Failed(e),
        };
        self.state = MessageState::Completed;
        if let Some(complete) = self.complete.take() {
            complete(self);
        }
    }

    /// Total number of bytes across all transfers.
    pub fn total_len(&self) -> usize {
        self.transfers.iter().map(|t| t.len).sum()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("device", &self.device)
            .field("transfers", &self.transfers)
            .field("actual_length", &self.actual_length)
            .field("status", &self.status)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Interface to a queued SPI controller.
pub trait SpiController {
    /// Validate `device` and program the controller for it if its settings
    /// differ from the current ones.
    fn setup(&self, device: &SpiDevice) -> Result<(), ConfigError>;

    /// Queue `message`. Returns immediately; the message comes back through
    /// its completion callback once processed.
    fn transfer(&self, message: Message);
}
