use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the transformation engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A filter parameter lies outside its valid domain. Raised during
    /// chain validation, before any sample is touched.
    #[error("invalid {filter} parameter: {reason}")]
    InvalidFilterParameter { filter: &'static str, reason: String },

    #[error("unknown genre '{0}'")]
    UnknownGenre(String),

    /// A stage produced non-finite output or otherwise failed numerically.
    #[error("signal processing failed in stage '{stage}': {reason}")]
    SignalProcessingFailure { stage: String, reason: String },

    #[error("signal is empty")]
    EmptySignal,

    #[error(transparent)]
    Audio(#[from] AudioIoError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub fn invalid(filter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidFilterParameter {
            filter,
            reason: reason.into(),
        }
    }

    pub fn stage_failure(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SignalProcessingFailure {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind, used in serialized outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFilterParameter { .. } => "InvalidFilterParameter",
            Self::UnknownGenre(_) => "UnknownGenre",
            Self::SignalProcessingFailure { .. } => "SignalProcessingFailure",
            Self::EmptySignal => "EmptySignal",
            Self::Audio(_) => "AudioIo",
            Self::Config(_) => "Config",
        }
    }
}

/// Classifier failures. These never abort a transformation; the
/// orchestrator downgrades them to "no prediction".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classifier model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("classification failed: {0}")]
    ClassificationFailed(String),
}

impl ClassifierError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelUnavailable(_) => "ModelUnavailable",
            Self::ClassificationFailed(_) => "ClassificationFailed",
        }
    }
}

#[derive(Error, Debug)]
pub enum AudioIoError {
    #[error("failed to read audio from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("failed to write audio to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("failed to stage output file in {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported audio format in {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
