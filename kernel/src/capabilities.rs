// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Special restricted capabilities.
//!
//! Capabilities are expressed as `unsafe` traits. Only code that can use
//! `unsafe` mechanisms can instantiate an object that provides an `unsafe`
//! trait. Functions that require certain capabilities require that they are
//! passed an object that provides the correct capability trait. The object
//! itself does not have to be marked `unsafe`.
//!
//! Creating an object that expresses a capability is straightforward:
//!
//! ```
//! use kernel::capabilities::SpiDiagnosticCapability;
//!
//! struct BringUpCap;
//! unsafe impl SpiDiagnosticCapability for BringUpCap {}
//! ```
//!
//! Requiring a certain capability is also straightforward:
//!
//! ```ignore
//! pub fn diagnose(&self, _cap: &dyn SpiDiagnosticCapability, cmd: DiagCommand) {
//!     ...
//! }
//! ```

/// The `SpiDiagnosticCapability` allows the holder to drive a SPI controller
/// directly, outside of its message queue, with raw select-line, rate, mode
/// and payload parameters. This is meant for board bring-up tooling only.
pub unsafe trait SpiDiagnosticCapability {}
