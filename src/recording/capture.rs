// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Live key capture into recordings.
//!
//! The recorder is driven with explicit `now` readings (epoch milliseconds)
//! so it never touches a clock itself. Pausing does not freeze anything: on
//! resume the virtual start time is pushed forward by the length of the
//! pause, which keeps every offset continuous.

use std::collections::HashMap;

use tracing::{debug, info};

use super::{RecordedNote, Recording, RecordingMetadata, SoundConfig};
use crate::sequencer::TaskHandle;

/// Recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    /// Not recording
    #[default]
    Idle,
    /// Actively recording
    Recording,
    /// Paused
    Paused,
}

/// What a key press did to the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStartOutcome {
    /// Not recording (idle or paused)
    Ignored,
    /// Key is now tracked as active
    Tracked,
    /// The press arrived past the maximum duration; the caller must stop
    LimitReached,
}

/// Key press recorder
pub struct Recorder {
    /// Current state
    state: RecordingState,
    /// Shell materialized on start (id, name, creation time)
    draft: Option<Recording>,
    /// Finished notes, in release order
    notes: Vec<RecordedNote>,
    /// Active keys -> start offset
    active_notes: HashMap<String, u64>,
    /// Virtual start time, shifted forward by paused intervals
    start_time: u64,
    /// When the current pause began
    paused_at: Option<u64>,
    /// Maximum recording length in ms
    max_duration_ms: u64,
    /// Pending limit task, if one is registered
    limit_task: Option<TaskHandle>,
}

impl Recorder {
    /// Create a recorder with the given maximum duration
    pub fn new(max_duration_ms: u64) -> Self {
        Self {
            state: RecordingState::Idle,
            draft: None,
            notes: Vec::new(),
            active_notes: HashMap::new(),
            start_time: 0,
            paused_at: None,
            max_duration_ms,
            limit_task: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// True while recording or paused
    pub fn is_active(&self) -> bool {
        self.state != RecordingState::Idle
    }

    /// True only while actively recording
    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        self.state == RecordingState::Paused
    }

    /// The in-progress recording shell
    pub fn draft(&self) -> Option<&Recording> {
        self.draft.as_ref()
    }

    /// Finished notes captured so far
    pub fn notes(&self) -> &[RecordedNote] {
        &self.notes
    }

    /// Number of keys currently held
    pub fn active_count(&self) -> usize {
        self.active_notes.len()
    }

    /// Maximum recording length in ms
    pub fn max_duration_ms(&self) -> u64 {
        self.max_duration_ms
    }

    /// Change the maximum length. Applies from the next `start`.
    pub fn set_max_duration_ms(&mut self, ms: u64) {
        self.max_duration_ms = ms;
    }

    /// Elapsed recording time at `now`, pauses excluded
    pub fn elapsed(&self, now: u64) -> u64 {
        let reference = self.paused_at.unwrap_or(now);
        reference.saturating_sub(self.start_time)
    }

    /// Time left before the limit at `now`
    pub fn remaining(&self, now: u64) -> u64 {
        self.max_duration_ms.saturating_sub(self.elapsed(now))
    }

    /// Remember the limit task registered for this session
    pub fn set_limit_task(&mut self, handle: Option<TaskHandle>) {
        self.limit_task = handle;
    }

    /// Take the limit task handle, leaving none
    pub fn take_limit_task(&mut self) -> Option<TaskHandle> {
        self.limit_task.take()
    }

    /// Check whether `handle` is this session's limit task
    pub fn owns_limit_task(&self, handle: TaskHandle) -> bool {
        self.limit_task == Some(handle)
    }

    /// Start recording. Fails if a session is already in progress.
    pub fn start(&mut self, name: impl Into<String>, now: u64) -> bool {
        if self.is_active() {
            return false;
        }

        self.notes.clear();
        self.active_notes.clear();
        self.start_time = now;
        self.paused_at = None;
        self.draft = Some(Recording::new(name, now));
        self.state = RecordingState::Recording;

        if let Some(draft) = &self.draft {
            info!(id = %draft.id, name = %draft.name, "recording started");
        }
        true
    }

    /// Pause recording, closing every held key at `now`
    pub fn pause(&mut self, now: u64) -> bool {
        if self.state != RecordingState::Recording {
            return false;
        }

        self.flush_active(now);
        self.paused_at = Some(now);
        self.state = RecordingState::Paused;
        debug!(elapsed = self.elapsed(now), "recording paused");
        true
    }

    /// Resume a paused recording
    pub fn resume(&mut self, now: u64) -> bool {
        if self.state != RecordingState::Paused {
            return false;
        }

        if let Some(paused_at) = self.paused_at.take() {
            self.start_time += now.saturating_sub(paused_at);
        }
        self.state = RecordingState::Recording;
        debug!(elapsed = self.elapsed(now), "recording resumed");
        true
    }

    /// Finalize the session into a recording.
    ///
    /// Stopping while paused ends the recording where the pause began.
    pub fn stop(&mut self, now: u64) -> Option<Recording> {
        if !self.is_active() {
            return None;
        }

        self.flush_active(now);
        let duration = self.elapsed(now);
        let notes = std::mem::take(&mut self.notes);
        let mut recording = self.draft.take()?;

        recording.metadata = Some(RecordingMetadata::from_notes(&notes));
        recording.duration = duration;
        recording.notes = notes;

        self.state = RecordingState::Idle;
        self.paused_at = None;

        info!(
            id = %recording.id,
            notes = recording.notes.len(),
            duration_ms = recording.duration,
            "recording stopped"
        );
        Some(recording)
    }

    /// Record a key press.
    ///
    /// A second press on a key that is still held replaces the earlier start.
    pub fn note_start(&mut self, key: &str, sound: &SoundConfig, now: u64) -> NoteStartOutcome {
        if self.state != RecordingState::Recording {
            return NoteStartOutcome::Ignored;
        }

        let offset = self.elapsed(now);
        if offset > self.max_duration_ms {
            return NoteStartOutcome::LimitReached;
        }

        debug!(key, instrument = %sound.instrument, offset, "note start");
        self.active_notes.insert(key.to_string(), offset);
        NoteStartOutcome::Tracked
    }

    /// Record a key release, returning the finished note
    pub fn note_end(&mut self, key: &str, sound: &SoundConfig, now: u64) -> Option<RecordedNote> {
        if self.state != RecordingState::Recording {
            return None;
        }

        let start = self.active_notes.remove(key)?;
        let end = self.elapsed(now);
        let note = RecordedNote::new(start, key, sound.clone(), end.saturating_sub(start));
        debug!(key, timestamp = note.timestamp, duration = note.duration, "note recorded");
        self.notes.push(note.clone());
        Some(note)
    }

    /// Close every held key at `now` with the default sound descriptor
    fn flush_active(&mut self, now: u64) {
        if self.active_notes.is_empty() {
            return;
        }

        let end = self.elapsed(now);
        let mut held: Vec<(String, u64)> = self.active_notes.drain().collect();
        held.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        for (key, start) in held {
            self.notes.push(RecordedNote::new(
                start,
                key,
                SoundConfig::default(),
                end.saturating_sub(start),
            ));
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_DURATION_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_700_000_000_000;

    fn cfg(instrument: &str) -> SoundConfig {
        SoundConfig::new(instrument, "A", 4, 440.0)
    }

    #[test]
    fn test_recorder_creation() {
        let recorder = Recorder::new(1_000);
        assert_eq!(recorder.state(), RecordingState::Idle);
        assert!(recorder.notes().is_empty());
        assert!(recorder.draft().is_none());
    }

    #[test]
    fn test_recorder_start_stop() {
        let mut recorder = Recorder::new(60_000);

        assert!(recorder.start("Take", T0));
        assert_eq!(recorder.state(), RecordingState::Recording);
        assert_eq!(recorder.draft().unwrap().created_at, T0);

        let recording = recorder.stop(T0 + 750).unwrap();
        assert_eq!(recorder.state(), RecordingState::Idle);
        assert_eq!(recording.name, "Take");
        assert_eq!(recording.duration, 750);
        assert!(recording.notes.is_empty());
    }

    #[test]
    fn test_start_twice_fails() {
        let mut recorder = Recorder::new(60_000);
        assert!(recorder.start("One", T0));
        let id = recorder.draft().unwrap().id.clone();

        assert!(!recorder.start("Two", T0 + 10));
        assert_eq!(recorder.draft().unwrap().id, id);
        assert_eq!(recorder.draft().unwrap().name, "One");
    }

    #[test]
    fn test_stop_when_idle() {
        let mut recorder = Recorder::new(60_000);
        assert!(recorder.stop(T0).is_none());
    }

    #[test]
    fn test_record_note() {
        let mut recorder = Recorder::new(60_000);
        recorder.start("Test", T0);

        assert_eq!(recorder.note_start("a", &cfg("piano"), T0), NoteStartOutcome::Tracked);
        let note = recorder.note_end("a", &cfg("piano"), T0 + 500).unwrap();
        assert_eq!(note.timestamp, 0);
        assert_eq!(note.duration, 500);

        let recording = recorder.stop(T0 + 500).unwrap();
        assert_eq!(recording.notes.len(), 1);
        assert!(recording.duration >= 500);
        assert_eq!(recording.metadata.unwrap().key_count, 1);
    }

    #[test]
    fn test_notes_in_release_order() {
        let mut recorder = Recorder::new(60_000);
        recorder.start("Overlap", T0);

        recorder.note_start("a", &cfg("piano"), T0 + 100);
        recorder.note_start("b", &cfg("piano"), T0 + 200);
        recorder.note_end("b", &cfg("piano"), T0 + 300);
        recorder.note_end("a", &cfg("piano"), T0 + 400);

        let keys: Vec<&str> = recorder.notes().iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(recorder.notes()[1].timestamp, 100);
        assert_eq!(recorder.notes()[1].duration, 300);
    }

    #[test]
    fn test_note_end_without_start_is_noop() {
        let mut recorder = Recorder::new(60_000);
        recorder.start("Test", T0);

        assert!(recorder.note_end("z", &cfg("piano"), T0 + 100).is_none());
        assert!(recorder.notes().is_empty());
    }

    #[test]
    fn test_note_events_ignored_when_idle() {
        let mut recorder = Recorder::new(60_000);
        assert_eq!(recorder.note_start("a", &cfg("piano"), T0), NoteStartOutcome::Ignored);
        assert!(recorder.note_end("a", &cfg("piano"), T0 + 5).is_none());
    }

    #[test]
    fn test_retrigger_overwrites_start() {
        let mut recorder = Recorder::new(60_000);
        recorder.start("Retrigger", T0);

        recorder.note_start("a", &cfg("piano"), T0 + 100);
        recorder.note_start("a", &cfg("piano"), T0 + 300);
        assert_eq!(recorder.active_count(), 1);

        let note = recorder.note_end("a", &cfg("piano"), T0 + 400).unwrap();
        assert_eq!(note.timestamp, 300);
        assert_eq!(note.duration, 100);
        assert_eq!(recorder.notes().len(), 1);
    }

    #[test]
    fn test_pause_flushes_with_default_sound() {
        let mut recorder = Recorder::new(60_000);
        recorder.start("Flush", T0);

        recorder.note_start("b", &cfg("synth"), T0 + 200);
        recorder.note_start("a", &cfg("synth"), T0 + 100);
        assert!(recorder.pause(T0 + 500));
        assert_eq!(recorder.active_count(), 0);

        let notes = recorder.notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].key, "a");
        assert_eq!(notes[0].duration, 400);
        assert_eq!(notes[1].key, "b");
        assert_eq!(notes[1].duration, 300);
        assert!(notes.iter().all(|n| n.sound_config == SoundConfig::default()));
    }

    #[test]
    fn test_pause_resume_excludes_gap() {
        let mut recorder = Recorder::new(60_000);
        recorder.start("Gap", T0);

        assert!(recorder.pause(T0 + 1_000));
        assert!(!recorder.pause(T0 + 1_100));
        assert!(recorder.resume(T0 + 5_000));
        assert!(!recorder.resume(T0 + 5_100));

        recorder.note_start("a", &cfg("piano"), T0 + 5_500);
        recorder.note_end("a", &cfg("piano"), T0 + 6_000);

        let recording = recorder.stop(T0 + 6_000).unwrap();
        assert_eq!(recording.duration, 2_000);
        assert_eq!(recording.notes[0].timestamp, 1_500);
        assert_eq!(recording.notes[0].duration, 500);
    }

    #[test]
    fn test_notes_ignored_while_paused() {
        let mut recorder = Recorder::new(60_000);
        recorder.start("Paused", T0);
        recorder.pause(T0 + 100);

        assert_eq!(recorder.note_start("a", &cfg("piano"), T0 + 200), NoteStartOutcome::Ignored);
        assert!(recorder.note_end("a", &cfg("piano"), T0 + 300).is_none());
    }

    #[test]
    fn test_stop_while_paused_ends_at_pause() {
        let mut recorder = Recorder::new(60_000);
        recorder.start("Paused stop", T0);
        recorder.pause(T0 + 800);

        let recording = recorder.stop(T0 + 10_000).unwrap();
        assert_eq!(recording.duration, 800);
    }

    #[test]
    fn test_stop_flushes_held_keys() {
        let mut recorder = Recorder::new(60_000);
        recorder.start("Held", T0);
        recorder.note_start("c", &cfg("organ"), T0 + 250);

        let recording = recorder.stop(T0 + 1_000).unwrap();
        assert_eq!(recording.notes.len(), 1);
        assert_eq!(recording.notes[0].duration, 750);
        assert_eq!(recording.metadata.unwrap().instruments_used, vec!["piano".to_string()]);
    }

    #[test]
    fn test_note_start_past_limit() {
        let mut recorder = Recorder::new(1_000);
        recorder.start("Limit", T0);

        assert_eq!(recorder.note_start("a", &cfg("piano"), T0 + 1_000), NoteStartOutcome::Tracked);
        assert_eq!(recorder.note_start("b", &cfg("piano"), T0 + 1_001), NoteStartOutcome::LimitReached);
        assert_eq!(recorder.active_count(), 1);
    }

    #[test]
    fn test_remaining_budget() {
        let mut recorder = Recorder::new(1_000);
        recorder.start("Budget", T0);
        recorder.pause(T0 + 300);
        recorder.resume(T0 + 900);
        assert_eq!(recorder.remaining(T0 + 1_000), 600);
    }

    #[test]
    fn test_new_session_resets_notes() {
        let mut recorder = Recorder::new(60_000);
        recorder.start("First", T0);
        recorder.note_start("a", &cfg("piano"), T0);
        recorder.note_end("a", &cfg("piano"), T0 + 10);
        recorder.stop(T0 + 10);

        recorder.start("Second", T0 + 100);
        assert!(recorder.notes().is_empty());
        let recording = recorder.stop(T0 + 200).unwrap();
        assert!(recording.notes.is_empty());
    }
}
