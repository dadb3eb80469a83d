// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording playback.
//!
//! `play` registers one task per note at `timestamp / speed` plus a
//! terminal task at `duration / speed`. The player owns every handle it
//! registered and only honours fired tasks whose handle it still owns, so
//! once `stop` returns nothing from that session can surface again.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{Scheduler, TaskHandle, TimerTask};
use crate::recording::{RecordedNote, Recording};

/// Snapshot of playback progress
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Whether a recording is playing
    pub is_playing: bool,
    /// Position within the recording (ms, recording time)
    pub current_time: u64,
    /// Length of the playing recording (ms)
    pub total_duration: u64,
    /// The playing recording
    pub recording: Option<Recording>,
    /// Playback speed multiplier
    pub speed: f64,
}

impl PlaybackState {
    /// State when nothing is playing
    pub fn idle() -> Self {
        Self {
            is_playing: false,
            current_time: 0,
            total_duration: 0,
            recording: None,
            speed: 1.0,
        }
    }

    /// Fraction played (0.0 - 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_duration == 0 {
            0.0
        } else {
            self.current_time as f64 / self.total_duration as f64
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::idle()
    }
}

/// What an owned task means when it fires
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackFire {
    /// A note is due
    Note(RecordedNote),
    /// The recording has finished
    End,
}

/// Recording player
pub struct Player {
    recording: Option<Recording>,
    speed: f64,
    started_at: u64,
    tasks: HashSet<TaskHandle>,
    min_speed: f64,
    max_speed: f64,
}

impl Player {
    /// Create a player accepting speeds within `min_speed..=max_speed`
    pub fn new(min_speed: f64, max_speed: f64) -> Self {
        Self {
            recording: None,
            speed: 1.0,
            started_at: 0,
            tasks: HashSet::new(),
            min_speed,
            max_speed,
        }
    }

    /// Change the accepted speed range. Applies from the next `play`.
    pub fn set_speed_range(&mut self, min_speed: f64, max_speed: f64) {
        self.min_speed = min_speed;
        self.max_speed = max_speed;
    }

    /// Check if playing
    pub fn is_playing(&self) -> bool {
        self.recording.is_some()
    }

    /// Current speed multiplier
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Tasks registered by the current session and not yet fired
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Check whether `handle` belongs to the current session
    pub fn owns(&self, handle: TaskHandle) -> bool {
        self.tasks.contains(&handle)
    }

    /// Start playing `recording`.
    ///
    /// Fails if already playing or if `speed` is not a positive finite
    /// number. Speeds outside the configured range are clamped, with a
    /// warning; `speed()` reports the speed actually used.
    pub fn play(
        &mut self,
        recording: Recording,
        speed: f64,
        now: u64,
        scheduler: &mut dyn Scheduler,
    ) -> bool {
        if self.is_playing() || !speed.is_finite() || speed <= 0.0 {
            return false;
        }
        let requested = speed;
        let speed = speed.clamp(self.min_speed, self.max_speed);
        if speed != requested {
            warn!(
                requested,
                used = speed,
                min = self.min_speed,
                max = self.max_speed,
                "playback speed out of range, clamped"
            );
        }

        for (index, note) in recording.notes.iter().enumerate() {
            let handle = scheduler.schedule(scaled(note.timestamp, speed), TimerTask::PlaybackNote(index));
            self.tasks.insert(handle);
        }
        let end = scheduler.schedule(scaled(recording.duration, speed), TimerTask::PlaybackEnd);
        self.tasks.insert(end);

        info!(
            id = %recording.id,
            notes = recording.notes.len(),
            speed,
            "playback started"
        );
        self.speed = speed;
        self.started_at = now;
        self.recording = Some(recording);
        true
    }

    /// Resolve a fired task. `None` means it is not ours (stale or foreign).
    pub fn fire(&mut self, handle: TaskHandle, task: TimerTask) -> Option<PlaybackFire> {
        if !self.tasks.remove(&handle) {
            return None;
        }

        match task {
            TimerTask::PlaybackNote(index) => {
                let note = self.recording.as_ref()?.notes.get(index)?.clone();
                debug!(key = %note.key, timestamp = note.timestamp, "playback note");
                Some(PlaybackFire::Note(note))
            }
            TimerTask::PlaybackEnd => Some(PlaybackFire::End),
            TimerTask::RecordingLimit => None,
        }
    }

    /// Stop playback, cancelling every outstanding task.
    ///
    /// Returns the recording that was playing, `None` if nothing was.
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) -> Option<Recording> {
        let recording = self.recording.take()?;

        for handle in self.tasks.drain() {
            scheduler.cancel(handle);
        }
        self.speed = 1.0;
        self.started_at = 0;

        info!(id = %recording.id, "playback stopped");
        Some(recording)
    }

    /// Pause playback.
    ///
    /// There is no resume-from-offset: this is a full stop and playing the
    /// recording again starts from the beginning.
    pub fn pause(&mut self, scheduler: &mut dyn Scheduler) -> Option<Recording> {
        self.stop(scheduler)
    }

    /// Playback progress at `now`
    pub fn state(&self, now: u64) -> PlaybackState {
        let Some(recording) = &self.recording else {
            return PlaybackState::idle();
        };

        let elapsed = now.saturating_sub(self.started_at) as f64 * self.speed;
        let total = recording.duration;
        PlaybackState {
            is_playing: true,
            current_time: (elapsed as u64).min(total),
            total_duration: total,
            recording: Some(recording.clone()),
            speed: self.speed,
        }
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MIN_SPEED, crate::config::DEFAULT_MAX_SPEED)
    }
}

/// Delay for a recording-time offset at `speed`.
///
/// The float to integer cast saturates, so absurd offsets become the
/// longest representable delay rather than wrapping.
fn scaled(ms: u64, speed: f64) -> Duration {
    Duration::from_millis((ms as f64 / speed).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::SoundConfig;
    use crate::sequencer::QueueScheduler;
    use crate::timing::{Clock, ManualClock};

    fn recording() -> Recording {
        let mut recording = Recording::new("Tune", 0);
        recording.duration = 1_000;
        recording.notes = vec![
            RecordedNote::new(0, "a", SoundConfig::default(), 100),
            RecordedNote::new(400, "s", SoundConfig::default(), 100),
            RecordedNote::new(800, "d", SoundConfig::default(), 100),
        ];
        recording
    }

    fn drain(player: &mut Player, scheduler: &mut QueueScheduler<ManualClock>) -> Vec<PlaybackFire> {
        scheduler
            .poll()
            .into_iter()
            .filter_map(|f| player.fire(f.handle, f.task))
            .collect()
    }

    #[test]
    fn test_play_schedules_notes_and_end() {
        let clock = ManualClock::new(0);
        let mut scheduler = QueueScheduler::new(clock.clone());
        let mut player = Player::default();

        assert!(player.play(recording(), 1.0, 0, &mut scheduler));
        assert_eq!(scheduler.pending(), 4);
        assert_eq!(player.pending_tasks(), 4);
        assert!(!player.play(recording(), 1.0, 0, &mut scheduler));
        assert_eq!(scheduler.pending(), 4);
    }

    #[test]
    fn test_notes_fire_in_order_at_speed() {
        let clock = ManualClock::new(0);
        let mut scheduler = QueueScheduler::new(clock.clone());
        let mut player = Player::default();
        player.play(recording(), 2.0, 0, &mut scheduler);

        clock.set(200);
        let fired = drain(&mut player, &mut scheduler);
        let keys: Vec<String> = fired
            .iter()
            .filter_map(|f| match f {
                PlaybackFire::Note(n) => Some(n.key.clone()),
                PlaybackFire::End => None,
            })
            .collect();
        assert_eq!(keys, vec!["a".to_string(), "s".to_string()]);

        clock.set(500);
        let fired = drain(&mut player, &mut scheduler);
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[1], PlaybackFire::End);
    }

    #[test]
    fn test_stop_cancels_everything() {
        let clock = ManualClock::new(0);
        let mut scheduler = QueueScheduler::new(clock.clone());
        let mut player = Player::default();
        player.play(recording(), 1.0, 0, &mut scheduler);

        let stopped = player.stop(&mut scheduler).unwrap();
        assert_eq!(stopped.name, "Tune");
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(player.pending_tasks(), 0);

        clock.set(10_000);
        assert!(drain(&mut player, &mut scheduler).is_empty());
        assert!(player.stop(&mut scheduler).is_none());
    }

    #[test]
    fn test_stale_handle_ignored_after_stop() {
        let clock = ManualClock::new(0);
        let mut scheduler = QueueScheduler::new(clock.clone());
        let mut player = Player::default();
        player.play(recording(), 1.0, 0, &mut scheduler);

        // Timer already elapsed but not yet delivered
        let in_flight = scheduler.poll();
        assert_eq!(in_flight.len(), 1);

        player.stop(&mut scheduler);
        assert!(player.fire(in_flight[0].handle, in_flight[0].task).is_none());
    }

    #[test]
    fn test_pause_is_stop() {
        let mut scheduler = QueueScheduler::new(ManualClock::new(0));
        let mut player = Player::default();
        player.play(recording(), 1.0, 0, &mut scheduler);

        assert!(player.pause(&mut scheduler).is_some());
        assert!(!player.is_playing());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_invalid_speed_rejected() {
        let mut scheduler = QueueScheduler::new(ManualClock::new(0));
        let mut player = Player::default();

        assert!(!player.play(recording(), 0.0, 0, &mut scheduler));
        assert!(!player.play(recording(), -1.0, 0, &mut scheduler));
        assert!(!player.play(recording(), f64::NAN, 0, &mut scheduler));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_speed_clamped() {
        let mut scheduler = QueueScheduler::new(ManualClock::new(0));
        let mut player = Player::new(0.5, 2.0);
        player.play(recording(), 10.0, 0, &mut scheduler);
        assert_eq!(player.speed(), 2.0);

        // The end task sits at duration / used speed, not the requested one
        assert_eq!(scheduler.next_due(), Some(0));
        scheduler.clock().set(499);
        let due: Vec<TimerTask> = scheduler.poll().into_iter().map(|f| f.task).collect();
        assert!(!due.contains(&TimerTask::PlaybackEnd));
        scheduler.clock().set(500);
        let due: Vec<TimerTask> = scheduler.poll().into_iter().map(|f| f.task).collect();
        assert_eq!(due, vec![TimerTask::PlaybackEnd]);
    }

    #[test]
    fn test_slow_speed_clamped_up() {
        let mut scheduler = QueueScheduler::new(ManualClock::new(0));
        let mut player = Player::new(0.5, 2.0);
        assert!(player.play(recording(), 0.01, 0, &mut scheduler));
        assert_eq!(player.speed(), 0.5);
        assert_eq!(player.state(100).current_time, 50);
    }

    #[test]
    fn test_huge_offsets_do_not_overflow() {
        let clock = ManualClock::new(1_000);
        let mut scheduler = QueueScheduler::new(clock.clone());
        let mut player = Player::new(0.1, 4.0);

        let mut huge = Recording::new("Huge", 0);
        huge.duration = u64::MAX;
        huge.notes = vec![RecordedNote::new(u64::MAX, "a", SoundConfig::default(), u64::MAX)];

        assert!(player.play(huge, 0.1, 1_000, &mut scheduler));
        assert_eq!(scheduler.pending(), 2);
        assert_eq!(scheduler.next_due(), Some(u64::MAX));

        clock.advance(1_000_000);
        assert!(drain(&mut player, &mut scheduler).is_empty());
        let state = player.state(clock.now_ms());
        assert_eq!(state.total_duration, u64::MAX);
        assert_eq!(state.current_time, 100_000);

        assert!(player.stop(&mut scheduler).is_some());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_state_progress() {
        let mut scheduler = QueueScheduler::new(ManualClock::new(0));
        let mut player = Player::default();
        assert_eq!(player.state(0), PlaybackState::idle());

        player.play(recording(), 2.0, 1_000, &mut scheduler);
        let state = player.state(1_250);
        assert!(state.is_playing);
        assert_eq!(state.current_time, 500);
        assert_eq!(state.total_duration, 1_000);
        assert_eq!(state.progress(), 0.5);

        // Clamped to the recording length
        assert_eq!(player.state(5_000).current_time, 1_000);
    }
}
