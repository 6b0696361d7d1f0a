// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! The per-controller worker.
//!
//! Submitters only ever touch the sending half of a channel. A single worker
//! thread drains it in order and is the only one running bus traffic, so at
//! most one message is active per controller. Once the last sender is gone
//! the worker shuts the hardware down on its way out.

use std::io;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use embedded_hal::delay::DelayNs;
use kernel::hil::spi::Message;
use log::{debug, warn};
use spin::Mutex;

use super::board::SpiccBoard;
use super::controller::Engine;

pub(crate) fn spawn_worker<B, D>(
    name: String,
    engine: Arc<Mutex<Engine<B, D>>>,
    pending: Receiver<Message>,
) -> io::Result<JoinHandle<()>>
where
    B: SpiccBoard,
    D: DelayNs + Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || run(&name, &engine, &pending))
}

/// Process messages until every sender is gone and the queue is empty.
fn run<B: SpiccBoard, D: DelayNs>(
    name: &str,
    engine: &Mutex<Engine<B, D>>,
    pending: &Receiver<Message>,
) {
    debug!("{}: worker running", name);
    while let Ok(mut message) = pending.recv() {
        message.activate();
        // The guard drops at the end of the statement, before the callback.
        let result = engine.lock().process(&mut message);
        if let Err(e) = &result {
            warn!(
                "{}: message failed after {} of {} bytes: {}",
                name,
                message.actual_length,
                message.total_len(),
                e
            );
        }
        message.complete(result);
    }
    debug!("{}: queue closed, worker exiting", name);
    engine.lock().shutdown();
}
