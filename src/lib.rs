// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! keytape: capture and replay of timed key performances.
//!
//! Key presses are recorded with their relative timing into `Recording`
//! values, stored through a string key-value backend, exchanged as text and
//! replayed at any speed through a host timer.

pub mod config;
pub mod engine;
pub mod error;
pub mod recording;
pub mod sequencer;
pub mod storage;
pub mod timing;

pub use config::EngineConfig;
pub use engine::{Engine, EngineEvent};
pub use error::{CodecError, StorageError};
pub use recording::{
    ExportFormat, RecordedNote, Recording, RecordingCodec, RecordingMetadata, RecordingStore,
    SoundConfig,
};
pub use sequencer::{Fired, PlaybackState, QueueScheduler, Scheduler, TaskHandle, TimerTask, TokioScheduler};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use timing::{Clock, ManualClock, SystemClock};
