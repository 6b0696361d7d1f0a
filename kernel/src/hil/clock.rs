// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Clock rate queries.

/// A clock whose frequency a peripheral divides down from.
pub trait SourceClock {
    /// Current frequency in Hz.
    fn frequency(&self) -> u32;
}
