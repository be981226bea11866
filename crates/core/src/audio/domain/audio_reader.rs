use std::path::Path;

use super::audio_signal::AudioSignal;
use crate::shared::error::AudioIoError;

/// Domain interface for decoding one audio file into a mono signal.
pub trait AudioReader: Send + Sync {
    /// Decode the file, downmixing every channel to mono at the file's
    /// native sample rate.
    fn read_audio(&self, path: &Path) -> Result<AudioSignal, AudioIoError>;
}
