use std::path::Path;

use crate::audio::domain::audio_signal::AudioSignal;
use crate::audio::domain::audio_writer::AudioWriter;
use crate::shared::constants::OUTPUT_BITS_PER_SAMPLE;
use crate::shared::error::AudioIoError;

/// Writes mono 16-bit PCM WAV at the signal's sample rate.
///
/// Writes straight to `path`; callers that need an atomic replace stage
/// the destination themselves.
pub struct WavAudioWriter;

impl AudioWriter for WavAudioWriter {
    fn write_audio(&self, path: &Path, signal: &AudioSignal) -> Result<(), AudioIoError> {
        let write_err = |source| AudioIoError::Write {
            path: path.to_path_buf(),
            source,
        };

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: signal.sample_rate(),
            bits_per_sample: OUTPUT_BITS_PER_SAMPLE,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec).map_err(write_err)?;
        for &sample in signal.samples() {
            writer
                .write_sample(to_pcm16(sample))
                .map_err(write_err)?;
        }
        writer.finalize().map_err(write_err)?;

        log::debug!("Wrote {} samples to {}", signal.len(), path.display());
        Ok(())
    }
}

fn to_pcm16(sample: f32) -> i16 {
    (sample * 32767.0).round().clamp(-32767.0, 32767.0) as i16
}
