use std::path::Path;

use super::audio_signal::AudioSignal;
use crate::shared::error::AudioIoError;

/// Domain interface for encoding a signal to an audio file.
pub trait AudioWriter: Send + Sync {
    fn write_audio(&self, path: &Path, signal: &AudioSignal) -> Result<(), AudioIoError>;
}
