// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Recording export and import.
//!
//! Exports a single recording as pretty JSON (default) or YAML. Import
//! accepts either form, validates the result and gives it a fresh id so an
//! imported copy never collides with the recording it was exported from.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{generate_id, Recording};
use crate::error::CodecError;

/// Interchange text format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl ExportFormat {
    /// Parse a format name ("json", "yaml" or "yml")
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "yaml" | "yml" => Some(ExportFormat::Yaml),
            _ => None,
        }
    }

    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
        }
    }
}

/// Recording text codec
#[derive(Debug, Clone, Default)]
pub struct RecordingCodec {
    /// Format used by `export`
    format: ExportFormat,
}

impl RecordingCodec {
    /// Create a JSON codec
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec exporting in `format`
    pub fn with_format(format: ExportFormat) -> Self {
        Self { format }
    }

    /// Get the export format
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Set the export format
    pub fn set_format(&mut self, format: ExportFormat) {
        self.format = format;
    }

    /// Serialize every field of a recording
    pub fn export(&self, recording: &Recording) -> Result<String, CodecError> {
        self.export_as(recording, self.format)
    }

    /// Serialize in an explicit format
    pub fn export_as(&self, recording: &Recording, format: ExportFormat) -> Result<String, CodecError> {
        match format {
            ExportFormat::Json => serde_json::to_string_pretty(recording)
                .map_err(|e| CodecError::Serialize(e.to_string())),
            ExportFormat::Yaml => {
                serde_yaml::to_string(recording).map_err(|e| CodecError::Serialize(e.to_string()))
            }
        }
    }

    /// Parse and validate exported text, assigning a fresh id
    pub fn decode(&self, text: &str) -> Result<Recording, CodecError> {
        let mut recording = parse(text)?;
        validate(&recording)?;
        recording.id = generate_id(recording.created_at);
        Ok(recording)
    }

    /// Like `decode`, but logs and discards the error
    pub fn import(&self, text: &str) -> Option<Recording> {
        match self.decode(text) {
            Ok(recording) => Some(recording),
            Err(e) => {
                warn!(error = %e, "recording import rejected");
                None
            }
        }
    }
}

fn parse(text: &str) -> Result<Recording, CodecError> {
    let json_err = match serde_json::from_str::<Recording>(text) {
        Ok(recording) => return Ok(recording),
        Err(e) => e,
    };

    serde_yaml::from_str::<Recording>(text)
        .map_err(|yaml_err| CodecError::Parse(format!("json: {}; yaml: {}", json_err, yaml_err)))
}

fn validate(recording: &Recording) -> Result<(), CodecError> {
    if recording.id.trim().is_empty() {
        return Err(CodecError::EmptyField("id"));
    }
    if recording.name.trim().is_empty() {
        return Err(CodecError::EmptyField("name"));
    }
    Ok(())
}
