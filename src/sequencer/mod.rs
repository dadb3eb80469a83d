// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Deferred work and playback.
//!
//! This module provides:
//! - The host timer abstraction (`Scheduler`) with a polled virtual-time
//!   implementation and a tokio implementation
//! - The recording player

pub mod player;
pub mod scheduler;

pub use player::{PlaybackFire, PlaybackState, Player};
pub use scheduler::{QueueScheduler, Scheduler, TokioScheduler};

/// Opaque handle for one scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(pub u64);

/// Work the engine defers to the host timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Emit the note at this index of the playing recording
    PlaybackNote(usize),
    /// Playback reached the end of the recording
    PlaybackEnd,
    /// The recording session hit its maximum duration
    RecordingLimit,
}

/// A task whose delay elapsed, handed back to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    /// Handle returned when the task was scheduled
    pub handle: TaskHandle,
    /// The task itself
    pub task: TimerTask,
}
