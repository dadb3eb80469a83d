// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Engine lifecycle events and their fan-out.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::recording::{RecordedNote, Recording};

/// Everything the engine announces to its listeners
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A recording session began; carries the empty shell
    RecordingStarted(Recording),
    /// The session was paused
    RecordingPaused,
    /// The session was resumed
    RecordingResumed,
    /// The session was finalized and stored
    RecordingStopped(Option<Recording>),
    /// The session was force-stopped at the maximum duration
    RecordingLimitReached,
    /// A key release completed a note
    NoteRecorded(RecordedNote),
    /// Playback began
    PlaybackStarted(Recording),
    /// A note is due during playback
    PlaybackNote(RecordedNote),
    /// Playback ended, by request or at the end of the recording
    PlaybackStopped(Option<Recording>),
    /// A stored recording was deleted
    RecordingDeleted(String),
    /// A stored recording was renamed
    RecordingRenamed {
        /// Recording id
        id: String,
        /// New name
        name: String,
    },
    /// A recording was imported and stored
    RecordingImported(Recording),
}

impl EngineEvent {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::RecordingStarted(_) => "recording_started",
            EngineEvent::RecordingPaused => "recording_paused",
            EngineEvent::RecordingResumed => "recording_resumed",
            EngineEvent::RecordingStopped(_) => "recording_stopped",
            EngineEvent::RecordingLimitReached => "recording_limit_reached",
            EngineEvent::NoteRecorded(_) => "note_recorded",
            EngineEvent::PlaybackStarted(_) => "playback_started",
            EngineEvent::PlaybackNote(_) => "playback_note",
            EngineEvent::PlaybackStopped(_) => "playback_stopped",
            EngineEvent::RecordingDeleted(_) => "recording_deleted",
            EngineEvent::RecordingRenamed { .. } => "recording_renamed",
            EngineEvent::RecordingImported(_) => "recording_imported",
        }
    }
}

/// Publish/subscribe fan-out over channels.
///
/// Subscribers whose receiver was dropped are pruned on the next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<EngineEvent>>,
}

impl EventBus {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Number of live subscribers as of the last publish
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver an event to every subscriber
    pub fn publish(&mut self, event: EngineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
