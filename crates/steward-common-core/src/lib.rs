// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core primitives shared by the Steward scheduler and monitor.

pub mod clock;
pub mod ticker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ticker::{Ticker, TickerHandle};
