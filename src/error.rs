// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for the capture and replay engine.
//!
//! None of these escape the engine façade: storage failures are logged and
//! swallowed at the store boundary, codec failures turn into `None` imports.

use thiserror::Error;

/// Failures of the external key-value store
#[derive(Debug, Error)]
pub enum StorageError {
    /// Writing the value would exceed the store's capacity
    #[error("storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded {
        /// Bytes the write would occupy
        needed: usize,
        /// Bytes still free before the write
        available: usize,
    },
    /// Underlying filesystem failure
    #[error("storage io error for key {key:?}: {source}")]
    Io {
        /// Key being read or written
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// The recording collection could not be (de)serialized
    #[error("recording collection serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures while importing an exported recording
#[derive(Debug, Error)]
pub enum CodecError {
    /// Text is neither valid JSON nor valid YAML for a recording
    #[error("unparseable recording text: {0}")]
    Parse(String),
    /// Parsed, but a required field is empty
    #[error("invalid recording: field `{0}` must not be empty")]
    EmptyField(&'static str),
    /// Export serialization failed
    #[error("recording serialization failed: {0}")]
    Serialize(String),
}
