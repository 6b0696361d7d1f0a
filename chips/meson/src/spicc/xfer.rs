// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Polled FIFO exchange.
//!
//! Words go out in bursts of at most one FIFO's worth: wait for the TX FIFO
//! to drain, push the burst, then collect the same number of words from the
//! RX FIFO. Multi-byte words are packed MSB first.

use embedded_hal::delay::DelayNs;
use kernel::hil::spi::{FifoFlag, TransferError, WordSize};
use log::{error, trace};

use super::config::{SpiccConfig, CONFIG};
use super::registers::{SpiccRegisters, STATREG};

fn pack8(chunk: &[u8]) -> u32 {
    u32::from(chunk[0])
}

fn pack16(chunk: &[u8]) -> u32 {
    u32::from(u16::from_be_bytes([chunk[0], chunk[1]]))
}

fn pack32(chunk: &[u8]) -> u32 {
    u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
}

fn unpack8(word: u32, out: &mut [u8]) {
    out[0] = word as u8;
}

fn unpack16(word: u32, out: &mut [u8]) {
    out[..2].copy_from_slice(&(word as u16).to_be_bytes());
}

fn unpack32(word: u32, out: &mut [u8]) {
    out[..4].copy_from_slice(&word.to_be_bytes());
}

/// Packing for one word size.
#[derive(Copy, Clone)]
struct Packing {
    word: WordSize,
    pack: fn(&[u8]) -> u32,
    unpack: fn(u32, &mut [u8]),
}

impl Packing {
    fn for_word(word: WordSize) -> Packing {
        match word {
            WordSize::Bits8 => Packing {
                word,
                pack: pack8,
                unpack: unpack8,
            },
            WordSize::Bits16 => Packing {
                word,
                pack: pack16,
                unpack: unpack16,
            },
            WordSize::Bits32 => Packing {
                word,
                pack: pack32,
                unpack: unpack32,
            },
        }
    }
}

/// Moves one transfer's bytes through the FIFOs. The block must already be
/// enabled and programmed.
pub struct TransferEngine<'a, R: SpiccRegisters, D: DelayNs> {
    regs: &'a R,
    delay: &'a mut D,
    config: &'a SpiccConfig,
}

impl<'a, R: SpiccRegisters, D: DelayNs> TransferEngine<'a, R, D> {
    pub fn new(regs: &'a R, delay: &'a mut D, config: &'a SpiccConfig) -> Self {
        TransferEngine {
            regs,
            delay,
            config,
        }
    }

    /// Exchange `len` bytes. Without `tx` zeros are sent; without `rx` the
    /// received words are dropped. Buffers must hold at least `len` bytes and
    /// `len` must be a whole number of words.
    pub fn execute(
        &mut self,
        tx: Option<&[u8]>,
        mut rx: Option<&mut [u8]>,
        len: usize,
    ) -> Result<(), TransferError> {
        if len == 0 {
            return Ok(());
        }
        let mut packing = self.packing()?;
        let mut remaining = len / packing.word.bytes();
        let mut offset = 0;

        while remaining > 0 {
            if offset > 0 {
                packing = self.packing()?;
            }
            let width = packing.word.bytes();
            let burst = remaining.min(self.config.fifo_depth);

            self.wait_for(FifoFlag::TxEmpty)?;
            for i in 0..burst {
                let at = offset + i * width;
                let word = tx.map_or(0, |buf| (packing.pack)(&buf[at..at + width]));
                if CONFIG.trace_words {
                    trace!("spicc{}: tx {:#x}", self.config.bus_num, word);
                }
                self.regs.push_tx(word);
            }

            for i in 0..burst {
                self.wait_for(FifoFlag::RxReady)?;
                self.settle(packing.word);
                let word = self.regs.pop_rx();
                if CONFIG.trace_words {
                    trace!("spicc{}: rx {:#x}", self.config.bus_num, word);
                }
                if let Some(buf) = rx.as_deref_mut() {
                    let at = offset + i * width;
                    (packing.unpack)(word, &mut buf[at..at + width]);
                }
            }

            offset += burst * width;
            remaining -= burst;
        }
        Ok(())
    }

    fn packing(&self) -> Result<Packing, TransferError> {
        let bits = self.regs.bits_per_word();
        match WordSize::from_bits(bits) {
            Some(word) => Ok(Packing::for_word(word)),
            None => {
                error!("spicc{}: unsupported bits/word {}", self.config.bus_num, bits);
                Err(TransferError::UnsupportedWordSize(bits))
            }
        }
    }

    /// Poll for `flag`, giving up after the configured number of retries.
    fn wait_for(&mut self, flag: FifoFlag) -> Result<(), TransferError> {
        let field = match flag {
            FifoFlag::TxEmpty => STATREG::TX_EMPTY,
            FifoFlag::RxReady => STATREG::RX_READY,
        };
        let mut retries = self.config.poll_retries;
        loop {
            if self.regs.statreg().is_set(field) {
                return Ok(());
            }
            if retries == 0 {
                error!("spicc{}: {} timeout", self.config.bus_num, flag);
                return Err(TransferError::Timeout(flag));
            }
            retries -= 1;
            self.delay.delay_us(self.config.poll_interval_us);
        }
    }

    /// Slow divider codes need time for wide words to land in RXDATA.
    fn settle(&mut self, word: WordSize) {
        let divider = self.regs.divider();
        if word != WordSize::Bits8 && divider > self.config.settle_div_threshold {
            let us = word.bits() * (divider - self.config.settle_div_threshold)
                + self.config.settle_base_us;
            self.delay.delay_us(us);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spicc::fake::{FakeBoard, RecordingDelay};
    use crate::spicc::mode::set_bits_per_word;
    use crate::spicc::registers::CONREG;
    use crate::spicc::SpiccBoard;

    fn enabled_board(word: WordSize, divider: u32) -> FakeBoard {
        let board = FakeBoard::new();
        set_bits_per_word(board.registers(), word);
        board
            .registers()
            .modify_conreg(CONREG::DATA_RATE_DIV.val(divider) + CONREG::EN::SET);
        board
    }

    #[test]
    fn sixteen_bit_words_are_msb_first() {
        let board = enabled_board(WordSize::Bits16, 2);
        let mut delay = RecordingDelay::new();
        let config = SpiccConfig::DEFAULT;
        let tx = [0x12, 0x34, 0x56, 0x78];
        let mut rx = [0; 4];

        let result = TransferEngine::new(board.registers(), &mut delay, &config).execute(
            Some(&tx[..]),
            Some(&mut rx[..]),
            4,
        );

        assert_eq!(result, Ok(()));
        assert_eq!(board.tx_words(), vec![0x1234, 0x5678]);
        assert_eq!(rx, tx);
        assert!(delay.waits().is_empty());
    }

    #[test]
    fn thirty_two_bit_words() {
        let board = enabled_board(WordSize::Bits32, 0);
        board.set_reply(|word| !word);
        let mut delay = RecordingDelay::new();
        let config = SpiccConfig::DEFAULT;
        let mut rx = [0; 8];

        let result = TransferEngine::new(board.registers(), &mut delay, &config).execute(
            Some(&[0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 1][..]),
            Some(&mut rx[..]),
            8,
        );

        assert_eq!(result, Ok(()));
        assert_eq!(board.tx_words(), vec![0xdead_beef, 1]);
        assert_eq!(rx, [0x21, 0x52, 0x41, 0x10, 0xff, 0xff, 0xff, 0xfe]);
    }

    #[test]
    fn no_tx_buffer_sends_zeros() {
        let board = enabled_board(WordSize::Bits8, 0);
        board.set_reply(|_| 0x5a);
        let mut delay = RecordingDelay::new();
        let config = SpiccConfig::DEFAULT;
        let mut rx = [0; 3];

        let result = TransferEngine::new(board.registers(), &mut delay, &config).execute(
            None,
            Some(&mut rx[..]),
            3,
        );

        assert_eq!(result, Ok(()));
        assert_eq!(board.tx_words(), vec![0, 0, 0]);
        assert_eq!(rx, [0x5a; 3]);
    }

    #[test]
    fn long_transfer_is_split_into_fifo_bursts() {
        let board = enabled_board(WordSize::Bits8, 0);
        let mut delay = RecordingDelay::new();
        let config = SpiccConfig::DEFAULT;
        let tx: Vec<u8> = (0..40).collect();
        let mut rx = vec![0; 40];

        let result = TransferEngine::new(board.registers(), &mut delay, &config).execute(
            Some(&tx[..]),
            Some(&mut rx[..]),
            40,
        );

        assert_eq!(result, Ok(()));
        assert_eq!(rx, tx);
        assert_eq!(board.tx_words().len(), 40);
    }

    #[test]
    fn zero_length_touches_nothing() {
        let board = FakeBoard::new();
        // Even an unsupported width is fine when nothing moves.
        board.registers().modify_conreg(CONREG::BITS_PER_WORD.val(11));
        let mut delay = RecordingDelay::new();
        let config = SpiccConfig::DEFAULT;
        assert_eq!(
            TransferEngine::new(board.registers(), &mut delay, &config).execute(None, None, 0),
            Ok(())
        );
        assert!(board.tx_words().is_empty());
    }

    #[test]
    fn stuck_tx_fifo_times_out_after_retries() {
        let board = enabled_board(WordSize::Bits8, 0);
        board.stall(Some(FifoFlag::TxEmpty));
        let mut delay = RecordingDelay::new();
        let config = SpiccConfig::DEFAULT;

        let result =
            TransferEngine::new(board.registers(), &mut delay, &config).execute(Some(&[1][..]), None, 1);

        assert_eq!(result, Err(TransferError::Timeout(FifoFlag::TxEmpty)));
        assert_eq!(delay.waits().len(), 100);
        assert_eq!(delay.total_us(), 100);
        assert!(board.tx_words().is_empty());
    }

    #[test]
    fn missing_rx_data_times_out() {
        let board = enabled_board(WordSize::Bits8, 0);
        board.stall(Some(FifoFlag::RxReady));
        let mut delay = RecordingDelay::new();
        let config = SpiccConfig::DEFAULT;
        let mut rx = [0; 2];

        let result = TransferEngine::new(board.registers(), &mut delay, &config).execute(
            Some(&[1, 2][..]),
            Some(&mut rx[..]),
            2,
        );

        assert_eq!(result, Err(TransferError::Timeout(FifoFlag::RxReady)));
        assert_eq!(delay.total_us(), 100);
    }

    #[test]
    fn unsupported_width_in_hardware() {
        let board = FakeBoard::new();
        board
            .registers()
            .modify_conreg(CONREG::BITS_PER_WORD.val(11) + CONREG::EN::SET);
        let mut delay = RecordingDelay::new();
        let config = SpiccConfig::DEFAULT;
        assert_eq!(
            TransferEngine::new(board.registers(), &mut delay, &config).execute(None, None, 4),
            Err(TransferError::UnsupportedWordSize(12))
        );
    }

    #[test]
    fn settle_delay_only_for_wide_words_at_slow_rates() {
        let config = SpiccConfig::DEFAULT;

        // 16 bits at divider 7: 16 * (7 - 5) + 10 us before each read.
        let board = enabled_board(WordSize::Bits16, 7);
        let mut delay = RecordingDelay::new();
        let result = TransferEngine::new(board.registers(), &mut delay, &config).execute(
            Some(&[0, 1, 0, 2][..]),
            None,
            4,
        );
        assert_eq!(result, Ok(()));
        assert_eq!(delay.waits(), vec![42, 42]);

        // 8-bit words never wait.
        let board = enabled_board(WordSize::Bits8, 7);
        let mut delay = RecordingDelay::new();
        let result = TransferEngine::new(board.registers(), &mut delay, &config).execute(
            Some(&[1, 2][..]),
            None,
            2,
        );
        assert_eq!(result, Ok(()));
        assert!(delay.waits().is_empty());

        // Nor do fast dividers.
        let board = enabled_board(WordSize::Bits32, 5);
        let mut delay = RecordingDelay::new();
        let result = TransferEngine::new(board.registers(), &mut delay, &config).execute(
            Some(&[0; 4][..]),
            None,
            4,
        );
        assert_eq!(result, Ok(()));
        assert!(delay.waits().is_empty());
    }
}
