use std::path::PathBuf;

use serde::Serialize;

use crate::audio::domain::audio_signal::AudioSignal;
use crate::classification::domain::classification_result::ClassificationResult;
use crate::shared::error::EngineError;

/// Result of one transform invocation. Owned by the caller; nothing is
/// retained by the engine once it is returned.
#[derive(Debug)]
pub struct TransformationOutcome {
    pub output: Option<AudioSignal>,
    pub output_path: Option<PathBuf>,
    pub classification: Option<ClassificationResult>,
    pub error: Option<EngineError>,
}

impl TransformationOutcome {
    pub fn succeeded(output: AudioSignal, classification: Option<ClassificationResult>) -> Self {
        Self {
            output: Some(output),
            output_path: None,
            classification,
            error: None,
        }
    }

    pub fn failed(error: EngineError) -> Self {
        Self {
            output: None,
            output_path: None,
            classification: None,
            error: Some(error),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn predicted_genre(&self) -> Option<&str> {
        self.classification.as_ref().map(|c| c.label.as_str())
    }

    pub fn confidence(&self) -> Option<f32> {
        self.classification.as_ref().map(|c| c.confidence)
    }

    /// Serializable summary without the sample data.
    pub fn report(&self) -> OutcomeReport {
        OutcomeReport {
            success: self.success(),
            output_path: self.output_path.clone(),
            predicted_genre: self.predicted_genre().map(str::to_string),
            confidence: self.confidence(),
            error: self.error.as_ref().map(|e| ErrorReport {
                kind: e.kind(),
                message: e.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeReport {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub predicted_genre: Option<String>,
    pub confidence: Option<f32>,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
}
