// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording data model, capture, persistence and interchange.
//!
//! This module provides:
//! - The `Recording` / `RecordedNote` value types and their metadata
//! - Live key capture into recordings
//! - The recording store over an external key-value collaborator
//! - Text export and import of single recordings

pub mod capture;
pub mod export;
pub mod store;

pub use capture::{NoteStartOutcome, Recorder, RecordingState};
pub use export::{ExportFormat, RecordingCodec};
pub use store::RecordingStore;

use rand::Rng;
use serde::{Deserialize, Serialize};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Sound descriptor supplied by the audio collaborator for each key press.
///
/// The engine only snapshots it; `instrument` is the one field it reads,
/// for metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SoundConfig {
    /// Instrument identifier
    pub instrument: String,
    /// Note name (e.g. "C", "F#")
    pub note: String,
    /// Octave number
    pub octave: i8,
    /// Frequency in Hz
    pub frequency: f64,
    /// Volume (0.0 - 1.0)
    pub volume: f64,
    /// Nominal sound length in seconds
    pub duration: f64,
    /// Display color
    pub color: String,
}

impl Default for SoundConfig {
    /// The descriptor substituted for notes still held when a recording is
    /// paused or stopped.
    fn default() -> Self {
        Self {
            instrument: "piano".to_string(),
            note: "C".to_string(),
            octave: 4,
            frequency: 261.63,
            volume: 0.7,
            duration: 0.5,
            color: "#ffffff".to_string(),
        }
    }
}

impl SoundConfig {
    /// Create a descriptor for an instrument and pitch with default levels
    pub fn new(instrument: impl Into<String>, note: impl Into<String>, octave: i8, frequency: f64) -> Self {
        Self {
            instrument: instrument.into(),
            note: note.into(),
            octave,
            frequency,
            ..Default::default()
        }
    }
}

/// One held-key interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedNote {
    /// Offset (ms) from recording start when the key went down
    pub timestamp: u64,
    /// Logical key identifier
    pub key: String,
    /// Sound snapshot at capture time
    pub sound_config: SoundConfig,
    /// How long the key was held (ms)
    pub duration: u64,
}

impl RecordedNote {
    /// Create a new recorded note
    pub fn new(timestamp: u64, key: impl Into<String>, sound_config: SoundConfig, duration: u64) -> Self {
        Self {
            timestamp,
            key: key.into(),
            sound_config,
            duration,
        }
    }

    /// Offset at which the key was released
    pub fn end(&self) -> u64 {
        self.timestamp.saturating_add(self.duration)
    }
}

/// Summary derived from the notes when a recording is finalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    /// Number of finished notes
    pub key_count: usize,
    /// Instrument ids in order of first appearance
    pub instruments_used: Vec<String>,
    /// Notes per second over the sounding span, two decimals
    pub avg_notes_per_second: f64,
}

impl RecordingMetadata {
    /// Derive metadata from a finished note list
    pub fn from_notes(notes: &[RecordedNote]) -> Self {
        let mut instruments_used: Vec<String> = Vec::new();
        for note in notes {
            if !instruments_used.contains(&note.sound_config.instrument) {
                instruments_used.push(note.sound_config.instrument.clone());
            }
        }

        let key_count = notes.len();
        let span_ms = notes.iter().map(RecordedNote::end).max().unwrap_or(0);
        let avg_notes_per_second = if span_ms == 0 {
            0.0
        } else {
            let raw = key_count as f64 / (span_ms as f64 / 1000.0);
            (raw * 100.0).round() / 100.0
        };

        Self {
            key_count,
            instruments_used,
            avg_notes_per_second,
        }
    }
}

/// A finalized performance capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    /// Unique identifier
    pub id: String,
    /// Display label
    pub name: String,
    /// Creation time, epoch milliseconds
    pub created_at: u64,
    /// Total recorded time excluding pauses (ms)
    pub duration: u64,
    /// Notes in the order their key release was observed
    pub notes: Vec<RecordedNote>,
    /// Tempo hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    /// Derived summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordingMetadata>,
}

impl Recording {
    /// Create an empty recording shell with a fresh id
    pub fn new(name: impl Into<String>, created_at: u64) -> Self {
        Self {
            id: generate_id(created_at),
            name: name.into(),
            created_at,
            duration: 0,
            notes: Vec::new(),
            bpm: None,
            metadata: None,
        }
    }

    /// Number of notes
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Set a tempo hint
    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = Some(bpm);
        self
    }
}

/// Generate a recording id: `rec_<created_at>_<random base36>`
pub fn generate_id(created_at: u64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("rec_{}_{}", created_at, suffix)
}
