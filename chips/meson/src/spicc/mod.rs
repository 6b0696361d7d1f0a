// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! SPI Communication Controller (SPICC) driver.
//!
//! The SPICC is the SPI controller of the Meson SoCs: a 16-word TX/RX FIFO
//! pair, a power-of-two SCLK divider, four internal chip-select channels and
//! no usable interrupt path in this driver, which polls.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let spicc = Spicc::attach(board, delay, SpiccConfig::DEFAULT.with_bus_num(0))?;
//!
//! let flash = SpiDevice::new(0, 20_000_000).with_cs_gpio(54);
//! spicc.setup(&flash)?;
//!
//! let id = spicc.transfer_sync(Message::new(
//!     flash,
//!     vec![Transfer::write(vec![0x9f]), Transfer::read(3)],
//! ))?;
//! ```
//!
//! Messages handed to [`Spicc::submit`] are queued and run one at a time,
//! in submission order, on a worker thread owned by the controller. Each one
//! comes back through its completion callback with its status and the number
//! of bytes that were moved.

mod board;
mod chip_select;
pub mod clock;
mod config;
mod controller;
mod diag;
mod mode;
mod queue;
pub mod registers;
mod xfer;

#[cfg(test)]
mod fake;

use std::sync::mpsc::{self, SendError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use embedded_hal::delay::DelayNs;
use kernel::capabilities::SpiDiagnosticCapability;
use kernel::hil::spi::{ConfigError, Message, SpiController, SpiDevice, SpiError};
use log::{error, info};
use spin::Mutex;
use thiserror::Error;

pub use self::board::SpiccBoard;
pub use self::chip_select::CsRoute;
pub use self::clock::ClockSetting;
pub use self::config::SpiccConfig;
pub use self::controller::ControllerState;
pub use self::diag::{DiagCommand, DiagParseError, DiagRequest, HELP};
pub use self::registers::{MmioSpicc, SpiccReg, SpiccRegisters, SPICC_BASE};

use self::controller::Engine;

#[derive(Debug, Error)]
pub enum AttachError {
    #[error("chip select setup failed: {0}")]
    ChipSelect(#[from] ConfigError),
    #[error("cannot start worker: {0}")]
    Worker(#[from] std::io::Error),
}

/// One attached SPICC controller.
///
/// Detaching (explicitly or by dropping) lets the worker finish everything
/// already queued, then disables the block and releases its select lines.
pub struct Spicc<B: SpiccBoard, D: DelayNs + Send + 'static> {
    name: String,
    engine: Arc<Mutex<Engine<B, D>>>,
    queue: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
}

impl<B: SpiccBoard, D: DelayNs + Send + 'static> Spicc<B, D> {
    /// Initialize the hardware and start the worker.
    pub fn attach(board: B, delay: D, config: SpiccConfig) -> Result<Spicc<B, D>, AttachError> {
        let name = config.name();
        let mut engine = Engine::new(board, delay, config);
        engine.hw_init()?;

        let engine = Arc::new(Mutex::new(engine));
        let (sender, pending) = mpsc::channel();
        let worker = match queue::spawn_worker(name.clone(), Arc::clone(&engine), pending) {
            Ok(worker) => worker,
            Err(e) => {
                error!("{}: {}", name, e);
                engine.lock().shutdown();
                return Err(e.into());
            }
        };

        info!("{}: attached", name);
        Ok(Spicc {
            name,
            engine,
            queue: Some(sender),
            worker: Some(worker),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate `device` and program the block for it if needed.
    ///
    /// Spins on the engine lock until the message in flight, if any, has
    /// finished, including any FIFO timeouts it runs into.
    pub fn setup(&self, device: &SpiDevice) -> Result<(), ConfigError> {
        self.engine.lock().configure(device)
    }

    /// Queue `message`. Never blocks on the bus.
    pub fn submit(&self, mut message: Message) {
        message.enqueue();
        let message = match &self.queue {
            Some(queue) => match queue.send(message) {
                Ok(()) => return,
                Err(SendError(message)) => message,
            },
            None => message,
        };
        error!("{}: no worker, dropping message", self.name);
        message.complete(Err(SpiError::Detached));
    }

    /// Queue `message` and wait for it to complete.
    ///
    /// Any completion callback already set on `message` is replaced. Called
    /// from a completion callback, it fails with [`SpiError::Reentrant`]
    /// instead of waiting on the worker it is running on.
    pub fn transfer_sync(&self, message: Message) -> Result<Message, SpiError> {
        if self.on_worker() {
            error!("{}: synchronous transfer from a completion callback", self.name);
            return Err(SpiError::Reentrant);
        }
        let (done, wait) = mpsc::sync_channel(1);
        self.submit(message.on_complete(move |message| {
            let _ = done.send(message);
        }));
        wait.recv().map_err(|_| SpiError::Detached)
    }

    /// Snapshot of what the registers are programmed for.
    ///
    /// Like [`Spicc::setup`], spins while a message is on the bus.
    pub fn state(&self) -> ControllerState {
        self.engine.lock().state().clone()
    }

    /// Run a bring-up command directly on the hardware, between queued
    /// messages. Returns the bytes read back.
    pub fn diagnose(
        &self,
        _cap: &dyn SpiDiagnosticCapability,
        command: &DiagCommand,
    ) -> Result<Vec<u8>, SpiError> {
        match command {
            DiagCommand::Help => {
                info!("{}", HELP);
                Ok(Vec::new())
            }
            DiagCommand::Exchange(request) => self.engine.lock().diagnose(request),
        }
    }

    /// Finish all queued messages, then shut the controller down.
    pub fn detach(mut self) {
        self.shutdown();
    }

    fn on_worker(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| worker.thread().id() == thread::current().id())
    }

    fn shutdown(&mut self) {
        // Closing the channel ends the worker once the queue is drained, and
        // the worker disables the block on its way out.
        drop(self.queue.take());
        if self.on_worker() {
            // Dropped from a completion callback. The worker finishes once
            // this callback returns.
            return;
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("{}: worker panicked", self.name);
            }
        }
        // Still needed when the worker died before reaching its own shutdown.
        self.engine.lock().shutdown();
    }
}

impl<B: SpiccBoard, D: DelayNs + Send + 'static> Drop for Spicc<B, D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<B: SpiccBoard, D: DelayNs + Send + 'static> SpiController for Spicc<B, D> {
    fn setup(&self, device: &SpiDevice) -> Result<(), ConfigError> {
        Spicc::setup(self, device)
    }

    fn transfer(&self, message: Message) {
        self.submit(message)
    }
}
