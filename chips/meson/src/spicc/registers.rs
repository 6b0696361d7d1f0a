// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! SPICC register map.
//!
//! The driver reaches the hardware only through [`SpiccRegisters`], a
//! word-granular read/write port. [`MmioSpicc`] backs it with the real
//! register block; tests back it with a model. Field-level access is layered
//! on top as provided methods working on [`LocalRegisterCopy`]s.

use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::registers::{
    register_bitfields, register_structs, FieldValue, LocalRegisterCopy, ReadOnly, ReadWrite,
    WriteOnly,
};
use kernel::utilities::StaticRef;
use log::debug;

register_structs! {
    pub SpiccRegisterBlock {
        /// Receive FIFO data port
        (0x00 => rxdata: ReadOnly<u32>),
        /// Transmit FIFO data port
        (0x04 => txdata: WriteOnly<u32>),
        /// Control register
        (0x08 => conreg: ReadWrite<u32, CONREG::Register>),
        /// Interrupt enable register
        (0x0C => intreg: ReadWrite<u32, INTREG::Register>),
        /// DMA control register
        (0x10 => dmareg: ReadWrite<u32>),
        /// Status register
        (0x14 => statreg: ReadWrite<u32, STATREG::Register>),
        /// Sample period register
        (0x18 => periodreg: ReadWrite<u32>),
        /// Test register
        (0x1C => testreg: ReadWrite<u32, TESTREG::Register>),
        (0x20 => @END),
    }
}

register_bitfields![u32,
    pub CONREG [
        /// Peripheral enable
        EN OFFSET(0) NUMBITS(1) [],
        /// Controller (master) mode
        MODE OFFSET(1) NUMBITS(1) [
            Slave = 0,
            Master = 1
        ],
        /// Start a burst now
        XCH OFFSET(2) NUMBITS(1) [],
        /// Burst start mode
        SMC OFFSET(3) NUMBITS(1) [
            /// Burst starts when XCH is written
            Exchange = 0,
            /// Burst starts as soon as the TX FIFO is not empty
            Pio = 1
        ],
        /// Clock polarity
        CLK_POL OFFSET(4) NUMBITS(1) [],
        /// Clock phase
        CLK_PHA OFFSET(5) NUMBITS(1) [],
        /// SS level between words of a burst
        SS_CTL OFFSET(6) NUMBITS(1) [],
        /// SS polarity, set for active high
        SS_POL OFFSET(7) NUMBITS(1) [],
        /// Data ready control
        DRCTL OFFSET(8) NUMBITS(2) [
            Ignore = 0,
            FallingEdge = 1,
            LowLevel = 2
        ],
        /// Internal chip select channel
        CHIP_SELECT OFFSET(12) NUMBITS(2) [],
        /// SCLK divider code, rate = clk >> (code + 2)
        DATA_RATE_DIV OFFSET(16) NUMBITS(3) [],
        /// Bits per word, minus one
        BITS_PER_WORD OFFSET(19) NUMBITS(6) []
    ],
    pub INTREG [
        TX_EMPTY_EN OFFSET(0) NUMBITS(1) [],
        TX_HALF_EN OFFSET(1) NUMBITS(1) [],
        TX_FULL_EN OFFSET(2) NUMBITS(1) [],
        RX_READY_EN OFFSET(3) NUMBITS(1) [],
        RX_HALF_EN OFFSET(4) NUMBITS(1) [],
        RX_FULL_EN OFFSET(5) NUMBITS(1) [],
        RX_OVERFLOW_EN OFFSET(6) NUMBITS(1) [],
        XFER_COMPLETE_EN OFFSET(7) NUMBITS(1) []
    ],
    pub STATREG [
        /// TX FIFO empty
        TX_EMPTY OFFSET(0) NUMBITS(1) [],
        /// TX FIFO at least half empty
        TX_HALF OFFSET(1) NUMBITS(1) [],
        /// TX FIFO full
        TX_FULL OFFSET(2) NUMBITS(1) [],
        /// RX FIFO holds at least one word
        RX_READY OFFSET(3) NUMBITS(1) [],
        /// RX FIFO at least half full
        RX_HALF OFFSET(4) NUMBITS(1) [],
        /// RX FIFO full
        RX_FULL OFFSET(5) NUMBITS(1) [],
        /// RX FIFO overflowed
        RX_OVERFLOW OFFSET(6) NUMBITS(1) [],
        /// Burst finished
        XFER_COMPLETE OFFSET(7) NUMBITS(1) []
    ],
    pub TESTREG [
        TX_COUNT OFFSET(0) NUMBITS(5) [],
        RX_COUNT OFFSET(5) NUMBITS(5) [],
        /// Keep the SPI clock running outside bursts
        CLK_FREE_EN OFFSET(24) NUMBITS(1) []
    ]
];

/// Channels the SS output can be steered to through `CONREG::CHIP_SELECT`.
pub const MAX_INTERNAL_CS: u8 = 4;

/// Base of the SPICC block on Meson8 and Meson8b.
pub const SPICC_BASE: StaticRef<SpiccRegisterBlock> =
    unsafe { StaticRef::new(0xC110_8D80 as *const SpiccRegisterBlock) };

/// One 32-bit register of the block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpiccReg {
    RxData,
    TxData,
    ConReg,
    IntReg,
    DmaReg,
    StatReg,
    PeriodReg,
    TestReg,
}

impl SpiccReg {
    pub const ALL: [SpiccReg; 8] = [
        SpiccReg::RxData,
        SpiccReg::TxData,
        SpiccReg::ConReg,
        SpiccReg::IntReg,
        SpiccReg::DmaReg,
        SpiccReg::StatReg,
        SpiccReg::PeriodReg,
        SpiccReg::TestReg,
    ];

    pub const fn offset(self) -> usize {
        match self {
            SpiccReg::RxData => 0x00,
            SpiccReg::TxData => 0x04,
            SpiccReg::ConReg => 0x08,
            SpiccReg::IntReg => 0x0C,
            SpiccReg::DmaReg => 0x10,
            SpiccReg::StatReg => 0x14,
            SpiccReg::PeriodReg => 0x18,
            SpiccReg::TestReg => 0x1C,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SpiccReg::RxData => "rxdata",
            SpiccReg::TxData => "txdata",
            SpiccReg::ConReg => "conreg",
            SpiccReg::IntReg => "intreg",
            SpiccReg::DmaReg => "dmareg",
            SpiccReg::StatReg => "statreg",
            SpiccReg::PeriodReg => "periodreg",
            SpiccReg::TestReg => "testreg",
        }
    }

    /// Reading this register has side effects, or it cannot be read at all.
    pub const fn is_data_port(self) -> bool {
        matches!(self, SpiccReg::RxData | SpiccReg::TxData)
    }
}

/// Word access to a SPICC register block.
///
/// Only `read` and `write` need implementing; everything else is built on
/// them.
pub trait SpiccRegisters {
    fn read(&self, reg: SpiccReg) -> u32;
    fn write(&self, reg: SpiccReg, value: u32);

    fn conreg(&self) -> LocalRegisterCopy<u32, CONREG::Register> {
        LocalRegisterCopy::new(self.read(SpiccReg::ConReg))
    }

    /// Read-modify-write of CONREG.
    fn modify_conreg(&self, fields: FieldValue<u32, CONREG::Register>) {
        let mut conreg = self.conreg();
        conreg.modify(fields);
        self.write(SpiccReg::ConReg, conreg.get());
    }

    fn statreg(&self) -> LocalRegisterCopy<u32, STATREG::Register> {
        LocalRegisterCopy::new(self.read(SpiccReg::StatReg))
    }

    fn testreg(&self) -> LocalRegisterCopy<u32, TESTREG::Register> {
        LocalRegisterCopy::new(self.read(SpiccReg::TestReg))
    }

    fn modify_testreg(&self, fields: FieldValue<u32, TESTREG::Register>) {
        let mut testreg = self.testreg();
        testreg.modify(fields);
        self.write(SpiccReg::TestReg, testreg.get());
    }

    fn enabled(&self) -> bool {
        self.conreg().is_set(CONREG::EN)
    }

    fn set_enabled(&self, enabled: bool) {
        if enabled {
            self.modify_conreg(CONREG::EN::SET);
        } else {
            self.modify_conreg(CONREG::EN::CLEAR);
        }
    }

    /// Divider code currently programmed.
    fn divider(&self) -> u32 {
        self.conreg().read(CONREG::DATA_RATE_DIV)
    }

    /// Raw word width currently programmed, in bits.
    fn bits_per_word(&self) -> u32 {
        self.conreg().read(CONREG::BITS_PER_WORD) + 1
    }

    fn push_tx(&self, word: u32) {
        self.write(SpiccReg::TxData, word);
    }

    fn pop_rx(&self) -> u32 {
        self.read(SpiccReg::RxData)
    }

    /// Log every readable register at debug level.
    fn dump(&self, name: &str) {
        for reg in SpiccReg::ALL.iter().filter(|r| !r.is_data_port()) {
            debug!(
                "{}: {:<9} [{:#04x}] = {:#010x}",
                name,
                reg.name(),
                reg.offset(),
                self.read(*reg)
            );
        }
    }
}

/// The memory-mapped SPICC block.
pub struct MmioSpicc {
    registers: StaticRef<SpiccRegisterBlock>,
}

impl MmioSpicc {
    pub const fn new(registers: StaticRef<SpiccRegisterBlock>) -> MmioSpicc {
        MmioSpicc { registers }
    }
}

// SAFETY: the block is only touched by whoever holds the controller engine
// lock, so moving the handle to the worker thread is sound.
unsafe impl Send for MmioSpicc {}

impl SpiccRegisters for MmioSpicc {
    fn read(&self, reg: SpiccReg) -> u32 {
        let regs = self.registers;
        match reg {
            SpiccReg::RxData => regs.rxdata.get(),
            // Write-only, reads back as zero.
            SpiccReg::TxData => 0,
            SpiccReg::ConReg => regs.conreg.get(),
            SpiccReg::IntReg => regs.intreg.get(),
            SpiccReg::DmaReg => regs.dmareg.get(),
            SpiccReg::StatReg => regs.statreg.get(),
            SpiccReg::PeriodReg => regs.periodreg.get(),
            SpiccReg::TestReg => regs.testreg.get(),
        }
    }

    fn write(&self, reg: SpiccReg, value: u32) {
        let regs = self.registers;
        match reg {
            SpiccReg::RxData => {}
            SpiccReg::TxData => regs.txdata.set(value),
            SpiccReg::ConReg => regs.conreg.set(value),
            SpiccReg::IntReg => regs.intreg.set(value),
            SpiccReg::DmaReg => regs.dmareg.set(value),
            SpiccReg::StatReg => regs.statreg.set(value),
            SpiccReg::PeriodReg => regs.periodreg.set(value),
            SpiccReg::TestReg => regs.testreg.set(value),
        }
    }
}
