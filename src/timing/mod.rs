// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing and clock module.
//!
//! This module provides the host clock abstraction used for recording
//! offsets, creation timestamps and playback progress.

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};
