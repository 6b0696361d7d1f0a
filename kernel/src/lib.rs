// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Core kernel crate shared by the chip drivers.
//!
//! It holds the Hardware Interface Layer (HIL) definitions that SPI
//! controller drivers implement and depend on, the standard error enum, the
//! capability traits used to gate privileged operations, and a few small
//! utilities (most notably the register interface re-export and
//! [`StaticRef`](utilities::StaticRef)).
//!
//! Most `unsafe` code is in this crate.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod capabilities;
pub mod errorcode;
pub mod hil;
pub mod platform;
pub mod utilities;

pub use crate::errorcode::ErrorCode;
pub use crate::platform::ClockInterface;

/// Create an object with the given capability.
///
/// ```
/// use kernel::capabilities::SpiDiagnosticCapability;
/// use kernel::create_capability;
///
/// let cap = create_capability!(SpiDiagnosticCapability);
/// ```
///
/// This helper macro cannot be called from `#![forbid(unsafe_code)]` crates,
/// and is used by trusted code to generate a capability that it can either
/// use or pass to another module.
#[macro_export]
macro_rules! create_capability {
    ($T:ty) => {{
        struct Cap;
        #[allow(unsafe_code)]
        unsafe impl $T for Cap {}
        Cap
    }};
}
