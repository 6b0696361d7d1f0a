// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! A software SPICC for tests.
//!
//! `FakeBoard` models a controller with MOSI looped back to MISO: every word
//! written to TXDATA while the block is enabled shows up in the RX FIFO. It
//! also stands in for every other board collaborator and records what the
//! driver did to them, in order. Clones share state, so a test can keep one
//! while the controller owns another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::delay::DelayNs;
use kernel::hil::clock::SourceClock;
use kernel::hil::gpio::{FloatingState, GpioLines, PullControl};
use kernel::hil::spi::FifoFlag;
use kernel::utilities::registers::LocalRegisterCopy;
use kernel::{ClockInterface, ErrorCode};

use super::board::SpiccBoard;
use super::registers::{SpiccReg, SpiccRegisters, CONREG};

pub const CLK81: u32 = 159_375_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Gate(bool),
    Enable(bool),
    Tx(u32),
    Request(u32),
    Cs { line: u32, high: bool },
    Input(u32),
    Release(u32),
    Pull(u32, FloatingState),
}

struct Bus {
    regs: [u32; 8],
    rx_fifo: VecDeque<u32>,
    stuck: Option<FifoFlag>,
    faulted: bool,
    reply: fn(u32) -> u32,
    source_hz: u32,
    gate: bool,
    held: Vec<u32>,
    missing: Vec<u32>,
    events: Vec<Event>,
}

#[derive(Clone)]
pub struct FakeBoard {
    bus: Arc<Mutex<Bus>>,
}

impl FakeBoard {
    pub fn new() -> FakeBoard {
        FakeBoard {
            bus: Arc::new(Mutex::new(Bus {
                regs: [0; 8],
                rx_fifo: VecDeque::new(),
                stuck: None,
                faulted: false,
                reply: |word| word,
                source_hz: CLK81,
                gate: false,
                held: Vec::new(),
                missing: Vec::new(),
                events: Vec::new(),
            })),
        }
    }

    fn bus(&self) -> MutexGuard<'_, Bus> {
        self.bus.lock().unwrap()
    }

    pub fn events(&self) -> Vec<Event> {
        self.bus().events.clone()
    }

    pub fn clear_events(&self) {
        self.bus().events.clear();
    }

    /// Words written to TXDATA, in order.
    pub fn tx_words(&self) -> Vec<u32> {
        self.bus()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Tx(word) => Some(*word),
                _ => None,
            })
            .collect()
    }

    /// Never raise `flag` again, or clear a previous stall with `None`.
    pub fn stall(&self, flag: Option<FifoFlag>) {
        self.bus().stuck = flag;
    }

    /// Make every later TXDATA write panic, taking the caller down with it.
    pub fn fault_bus(&self) {
        self.bus().faulted = true;
    }

    /// Answer each transmitted word with `reply(word)` instead of an echo.
    pub fn set_reply(&self, reply: fn(u32) -> u32) {
        self.bus().reply = reply;
    }

    pub fn set_source_hz(&self, hz: u32) {
        self.bus().source_hz = hz;
    }

    /// Make requests for `line` fail with `NODEVICE`.
    pub fn remove_line(&self, line: u32) {
        self.bus().missing.push(line);
    }

    pub fn held_lines(&self) -> Vec<u32> {
        self.bus().held.clone()
    }

    pub fn gate_enabled(&self) -> bool {
        self.bus().gate
    }

    pub fn conreg_copy(&self) -> LocalRegisterCopy<u32, CONREG::Register> {
        LocalRegisterCopy::new(self.bus().regs[SpiccReg::ConReg.offset() / 4])
    }
}

impl SpiccRegisters for FakeBoard {
    fn read(&self, reg: SpiccReg) -> u32 {
        let mut bus = self.bus();
        match reg {
            SpiccReg::RxData => bus.rx_fifo.pop_front().unwrap_or(0),
            SpiccReg::TxData => 0,
            SpiccReg::StatReg => {
                let mut status = 0;
                if bus.stuck != Some(FifoFlag::TxEmpty) {
                    status |= 1 << 0;
                }
                if bus.stuck != Some(FifoFlag::RxReady) && !bus.rx_fifo.is_empty() {
                    status |= 1 << 3;
                }
                status
            }
            _ => bus.regs[reg.offset() / 4],
        }
    }

    fn write(&self, reg: SpiccReg, value: u32) {
        let mut bus = self.bus();
        if reg == SpiccReg::TxData && bus.faulted {
            drop(bus);
            panic!("spicc bus fault");
        }
        let conreg: LocalRegisterCopy<u32, CONREG::Register> =
            LocalRegisterCopy::new(bus.regs[SpiccReg::ConReg.offset() / 4]);
        match reg {
            SpiccReg::RxData | SpiccReg::StatReg => {}
            SpiccReg::TxData => {
                bus.events.push(Event::Tx(value));
                if conreg.is_set(CONREG::EN) {
                    let bits = conreg.read(CONREG::BITS_PER_WORD) + 1;
                    let mask = if bits >= 32 {
                        u32::MAX
                    } else {
                        (1 << bits) - 1
                    };
                    let reply = (bus.reply)(value & mask) & mask;
                    bus.rx_fifo.push_back(reply);
                }
            }
            SpiccReg::ConReg => {
                let was = conreg.is_set(CONREG::EN);
                let now = LocalRegisterCopy::<u32, CONREG::Register>::new(value).is_set(CONREG::EN);
                if was != now {
                    bus.events.push(Event::Enable(now));
                }
                bus.regs[reg.offset() / 4] = value;
            }
            _ => bus.regs[reg.offset() / 4] = value,
        }
    }
}

impl GpioLines for FakeBoard {
    type Handle = u32;

    fn request(&self, line: u32, _label: &'static str) -> Result<u32, ErrorCode> {
        let mut bus = self.bus();
        if bus.missing.contains(&line) {
            return Err(ErrorCode::NODEVICE);
        }
        if bus.held.contains(&line) {
            return Err(ErrorCode::BUSY);
        }
        bus.held.push(line);
        bus.events.push(Event::Request(line));
        Ok(line)
    }

    fn drive(&self, handle: &u32, high: bool) {
        self.bus().events.push(Event::Cs {
            line: *handle,
            high,
        });
    }

    fn make_input(&self, handle: &u32) {
        self.bus().events.push(Event::Input(*handle));
    }

    fn release(&self, handle: u32) {
        let mut bus = self.bus();
        bus.held.retain(|&line| line != handle);
        bus.events.push(Event::Release(handle));
    }
}

impl ClockInterface for FakeBoard {
    fn is_enabled(&self) -> bool {
        self.bus().gate
    }

    fn enable(&self) {
        let mut bus = self.bus();
        bus.gate = true;
        bus.events.push(Event::Gate(true));
    }

    fn disable(&self) {
        let mut bus = self.bus();
        bus.gate = false;
        bus.events.push(Event::Gate(false));
    }
}

impl SourceClock for FakeBoard {
    fn frequency(&self) -> u32 {
        self.bus().source_hz
    }
}

impl PullControl for FakeBoard {
    fn set_floating_state(&self, pin: u32, state: FloatingState) {
        self.bus().events.push(Event::Pull(pin, state));
    }
}

impl SpiccBoard for FakeBoard {
    type Registers = FakeBoard;
    type CsHandle = u32;
    type Gpio = FakeBoard;
    type Gate = FakeBoard;
    type Source = FakeBoard;
    type Pins = FakeBoard;

    fn registers(&self) -> &FakeBoard {
        self
    }
    fn gpio(&self) -> &FakeBoard {
        self
    }
    fn clock_gate(&self) -> &FakeBoard {
        self
    }
    fn source_clock(&self) -> &FakeBoard {
        self
    }
    fn pins(&self) -> &FakeBoard {
        self
    }
}

/// Records every delay instead of waiting.
#[derive(Clone, Default)]
pub struct RecordingDelay {
    waits_us: Arc<Mutex<Vec<u32>>>,
}

impl RecordingDelay {
    pub fn new() -> RecordingDelay {
        RecordingDelay::default()
    }

    /// Every delay so far, in microseconds.
    pub fn waits(&self) -> Vec<u32> {
        self.waits_us.lock().unwrap().clone()
    }

    pub fn total_us(&self) -> u64 {
        self.waits().iter().map(|&us| u64::from(us)).sum()
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waits_us.lock().unwrap().push(ns.div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.waits_us.lock().unwrap().push(us);
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
