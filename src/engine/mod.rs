// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Capture-and-replay engine façade.
//!
//! Owns the recorder, player, store and codec, keeps recording and playback
//! mutually exclusive, and publishes every lifecycle change on its event
//! bus. All mutation happens synchronously inside one call; deferred work
//! comes back through `dispatch`.

pub mod events;

pub use events::{EngineEvent, EventBus};

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::recording::{
    NoteStartOutcome, Recorder, Recording, RecordingCodec, RecordingState, RecordingStore,
    SoundConfig,
};
use crate::sequencer::{
    Fired, PlaybackFire, PlaybackState, Player, QueueScheduler, Scheduler, TimerTask,
    TokioScheduler,
};
use crate::storage::KeyValueStore;
use crate::timing::{Clock, ManualClock};

/// The recording/playback engine
pub struct Engine<S: Scheduler> {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    scheduler: S,
    recorder: Recorder,
    player: Player,
    store: RecordingStore,
    codec: RecordingCodec,
    events: EventBus,
}

impl<S: Scheduler> Engine<S> {
    /// Create an engine; the store loads from `backend` immediately.
    ///
    /// `clock` timestamps recordings and playback while `scheduler` decides
    /// when tasks fire, so both must read the same time base. For a polled
    /// scheduler prefer `with_queue`, which shares one clock.
    pub fn new(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        scheduler: S,
        backend: Box<dyn KeyValueStore>,
    ) -> Self {
        let store = RecordingStore::new(backend, config.storage.key.clone());
        Self {
            recorder: Recorder::new(config.recording.max_duration_ms),
            player: Player::new(config.playback.min_speed, config.playback.max_speed),
            codec: RecordingCodec::with_format(config.export.format),
            config,
            clock,
            scheduler,
            store,
            events: EventBus::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Swap in a new configuration.
    ///
    /// Limits and speed ranges apply from the next session. The storage key
    /// is fixed for the lifetime of the engine.
    pub fn apply_config(&mut self, config: EngineConfig) {
        if config.storage.key != self.config.storage.key {
            warn!(
                current = %self.config.storage.key,
                requested = %config.storage.key,
                "storage key changes need a restart"
            );
        }
        self.recorder.set_max_duration_ms(config.recording.max_duration_ms);
        self.player
            .set_speed_range(config.playback.min_speed, config.playback.max_speed);
        self.codec.set_format(config.export.format);
        self.config = config;
        info!("engine configuration applied");
    }

    /// Register an event listener
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// The host timer
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// The host timer, mutably
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn publish(&mut self, event: EngineEvent) {
        trace!(event = event.name(), "publish");
        self.events.publish(event);
    }

    // ---- recording ----

    /// True while a session is recording or paused
    pub fn is_recording(&self) -> bool {
        self.recorder.is_active()
    }

    /// Recorder state
    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    /// Elapsed time of the current session, pauses excluded
    pub fn recording_elapsed(&self) -> u64 {
        if self.recorder.is_active() {
            self.recorder.elapsed(self.now())
        } else {
            0
        }
    }

    /// Start a recording session.
    ///
    /// Fails while recording or playing. A missing or blank name gets the
    /// configured prefix and the next ordinal.
    pub fn start_recording(&mut self, name: Option<&str>) -> bool {
        if self.recorder.is_active() || self.player.is_playing() {
            debug!("start refused: engine busy");
            return false;
        }

        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!(
                "{} {}",
                self.config.recording.default_name_prefix,
                self.store.len() + 1
            ),
        };

        let now = self.now();
        if !self.recorder.start(name, now) {
            return false;
        }
        self.schedule_limit(self.recorder.max_duration_ms());

        if let Some(draft) = self.recorder.draft().cloned() {
            self.publish(EngineEvent::RecordingStarted(draft));
        }
        true
    }

    /// Pause the session, closing held keys
    pub fn pause_recording(&mut self) -> bool {
        let now = self.now();
        if !self.recorder.pause(now) {
            return false;
        }
        self.cancel_limit();
        self.publish(EngineEvent::RecordingPaused);
        true
    }

    /// Resume a paused session
    pub fn resume_recording(&mut self) -> bool {
        let now = self.now();
        if !self.recorder.resume(now) {
            return false;
        }
        self.schedule_limit(self.recorder.remaining(now));
        self.publish(EngineEvent::RecordingResumed);
        true
    }

    /// Finalize the session, store it and return it
    pub fn stop_recording(&mut self) -> Option<Recording> {
        let now = self.now();
        let recording = self.recorder.stop(now)?;
        self.cancel_limit();

        self.store.insert(recording.clone());
        self.publish(EngineEvent::RecordingStopped(Some(recording.clone())));
        Some(recording)
    }

    /// A key went down
    pub fn note_start(&mut self, key: &str, sound: &SoundConfig) {
        let now = self.now();
        if self.recorder.note_start(key, sound, now) == NoteStartOutcome::LimitReached {
            self.stop_at_limit();
        }
    }

    /// A key came up
    pub fn note_end(&mut self, key: &str, sound: &SoundConfig) {
        let now = self.now();
        if let Some(note) = self.recorder.note_end(key, sound, now) {
            self.publish(EngineEvent::NoteRecorded(note));
        }
    }

    fn schedule_limit(&mut self, after_ms: u64) {
        let handle = self
            .scheduler
            .schedule(Duration::from_millis(after_ms), TimerTask::RecordingLimit);
        if let Some(previous) = self.recorder.take_limit_task() {
            self.scheduler.cancel(previous);
        }
        self.recorder.set_limit_task(Some(handle));
    }

    fn cancel_limit(&mut self) {
        if let Some(handle) = self.recorder.take_limit_task() {
            self.scheduler.cancel(handle);
        }
    }

    fn stop_at_limit(&mut self) {
        if let Some(recording) = self.stop_recording() {
            warn!(
                id = %recording.id,
                max_ms = self.recorder.max_duration_ms(),
                "recording limit reached"
            );
            self.publish(EngineEvent::RecordingLimitReached);
        }
    }

    // ---- playback ----

    /// Check if playing
    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    /// Play a stored recording; `None` speed uses the configured default
    pub fn play(&mut self, id: &str, speed: Option<f64>) -> bool {
        match self.store.get(id).cloned() {
            Some(recording) => self.play_recording(recording, speed),
            None => {
                debug!(id, "play refused: unknown recording");
                false
            }
        }
    }

    /// Play any recording value
    pub fn play_recording(&mut self, recording: Recording, speed: Option<f64>) -> bool {
        if self.recorder.is_active() {
            debug!("play refused: recording in progress");
            return false;
        }

        let speed = speed.unwrap_or(self.config.playback.default_speed);
        let now = self.now();
        if !self
            .player
            .play(recording.clone(), speed, now, &mut self.scheduler)
        {
            return false;
        }
        self.publish(EngineEvent::PlaybackStarted(recording));
        true
    }

    /// Stop playback. Returns false if nothing was playing.
    pub fn stop_playback(&mut self) -> bool {
        match self.player.stop(&mut self.scheduler) {
            Some(recording) => {
                self.publish(EngineEvent::PlaybackStopped(Some(recording)));
                true
            }
            None => false,
        }
    }

    /// Pause playback. This is a full stop; playing again restarts.
    pub fn pause_playback(&mut self) -> bool {
        match self.player.pause(&mut self.scheduler) {
            Some(recording) => {
                self.publish(EngineEvent::PlaybackStopped(Some(recording)));
                true
            }
            None => false,
        }
    }

    /// Playback progress
    pub fn playback_state(&self) -> PlaybackState {
        self.player.state(self.now())
    }

    // ---- deferred work ----

    /// Act on a task whose timer elapsed.
    ///
    /// Tasks whose handle is no longer owned (cancelled after the timer
    /// fired) are dropped.
    pub fn dispatch(&mut self, fired: Fired) {
        match fired.task {
            TimerTask::RecordingLimit => {
                if self.recorder.owns_limit_task(fired.handle) {
                    self.recorder.take_limit_task();
                    self.stop_at_limit();
                } else {
                    trace!(handle = ?fired.handle, "stale limit task");
                }
            }
            task => match self.player.fire(fired.handle, task) {
                Some(PlaybackFire::Note(note)) => self.publish(EngineEvent::PlaybackNote(note)),
                Some(PlaybackFire::End) => {
                    self.stop_playback();
                }
                None => trace!(handle = ?fired.handle, "stale playback task"),
            },
        }
    }

    // ---- store and codec ----

    /// All stored recordings, newest first
    pub fn list(&self) -> Vec<Recording> {
        self.store.list()
    }

    /// Look up a stored recording
    pub fn get(&self, id: &str) -> Option<&Recording> {
        self.store.get(id)
    }

    /// Delete a stored recording
    pub fn delete(&mut self, id: &str) -> bool {
        if !self.store.delete(id) {
            return false;
        }
        self.publish(EngineEvent::RecordingDeleted(id.to_string()));
        true
    }

    /// Rename a stored recording
    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        if !self.store.rename(id, name) {
            return false;
        }
        let name = self
            .store
            .get(id)
            .map(|r| r.name.clone())
            .unwrap_or_default();
        self.publish(EngineEvent::RecordingRenamed {
            id: id.to_string(),
            name,
        });
        true
    }

    /// Export a stored recording in the configured format
    pub fn export(&self, id: &str) -> Option<String> {
        let recording = self.store.get(id)?;
        match self.codec.export(recording) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(id, error = %e, "export failed");
                None
            }
        }
    }

    /// Import exported text as a new stored recording
    pub fn import(&mut self, text: &str) -> Option<Recording> {
        let recording = self.codec.import(text)?;
        info!(id = %recording.id, name = %recording.name, "recording imported");
        self.store.insert(recording.clone());
        self.publish(EngineEvent::RecordingImported(recording.clone()));
        Some(recording)
    }

    /// The codec used for export and import
    pub fn codec(&self) -> &RecordingCodec {
        &self.codec
    }
}

impl<C: Clock + Clone + 'static> Engine<QueueScheduler<C>> {
    /// Create an engine over a polled scheduler sharing the engine's clock
    pub fn with_queue(config: EngineConfig, clock: C, backend: Box<dyn KeyValueStore>) -> Self {
        let scheduler = QueueScheduler::new(clock.clone());
        Self::new(config, Arc::new(clock), scheduler, backend)
    }
    /// Dispatch every task already due. Returns how many were dispatched.
    pub fn run_due(&mut self) -> usize {
        let fired = self.scheduler.poll();
        let count = fired.len();
        for task in fired {
            self.dispatch(task);
        }
        count
    }
}

impl Engine<QueueScheduler<ManualClock>> {
    /// Move virtual time forward, dispatching tasks at their due times
    pub fn advance(&mut self, ms: u64) -> usize {
        let target = self.scheduler.clock().now_ms().saturating_add(ms);
        let mut dispatched = 0;

        while let Some(due) = self.scheduler.next_due() {
            if due > target {
                break;
            }
            self.scheduler.clock().set(due);
            dispatched += self.run_due();
        }

        self.scheduler.clock().set(target);
        dispatched
    }
}

impl Engine<TokioScheduler> {
    /// Dispatch fired tasks until neither recording nor playback is active
    pub async fn run_until_idle(&mut self, fired: &mut UnboundedReceiver<Fired>) {
        while self.is_playing() || self.is_recording() {
            match fired.recv().await {
                Some(task) => self.dispatch(task),
                None => break,
            }
        }
    }
}
