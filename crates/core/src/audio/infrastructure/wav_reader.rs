use std::path::Path;

use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::audio_signal::AudioSignal;
use crate::shared::error::AudioIoError;

/// Decodes RIFF/WAVE files (integer or float PCM, any channel count) via `hound`.
pub struct WavAudioReader;

impl AudioReader for WavAudioReader {
    fn read_audio(&self, path: &Path) -> Result<AudioSignal, AudioIoError> {
        let read_err = |source| AudioIoError::Read {
            path: path.to_path_buf(),
            source,
        };

        let reader = hound::WavReader::open(path).map_err(read_err)?;
        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(AudioIoError::Unsupported {
                path: path.to_path_buf(),
                reason: format!(
                    "{} channels at {} Hz",
                    spec.channels, spec.sample_rate
                ),
            });
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(read_err)?,
            hound::SampleFormat::Int => {
                let full_scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<_, _>>()
                    .map_err(read_err)?
            }
        };

        let mono = downmix(&interleaved, spec.channels as usize);
        log::debug!(
            "Decoded {} ({} Hz, {} ch, {} samples)",
            path.display(),
            spec.sample_rate,
            spec.channels,
            mono.len()
        );
        Ok(AudioSignal::new(mono, spec.sample_rate))
    }
}

/// Average interleaved channels into one.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tempfile::TempDir;

    fn write_wav(path: &Path, spec: hound::WavSpec, samples: &[i16]) {
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_read_audio_nonexistent_file() {
        let reader = WavAudioReader;
        let path = if cfg!(windows) {
            Path::new("Z:\\nonexistent\\file.wav")
        } else {
            Path::new("/nonexistent/file.wav")
        };
        assert!(matches!(
            reader.read_audio(path),
            Err(AudioIoError::Read { .. })
        ));
    }

    #[test]
    fn test_reads_mono_int16() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mono.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        write_wav(&path, spec, &[0, 16384, -16384, 32767]);

        let signal = WavAudioReader.read_audio(&path).unwrap();
        assert_eq!(signal.sample_rate(), 22050);
        assert_eq!(signal.len(), 4);
        assert_abs_diff_eq!(signal.samples()[1], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(signal.samples()[2], -0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_stereo_is_downmixed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        write_wav(&path, spec, &[16384, 0, 0, -16384]);

        let signal = WavAudioReader.read_audio(&path).unwrap();
        assert_eq!(signal.len(), 2);
        assert_abs_diff_eq!(signal.samples()[0], 0.25, epsilon = 1e-4);
        assert_abs_diff_eq!(signal.samples()[1], -0.25, epsilon = 1e-4);
    }

    #[test]
    fn test_downmix_mono_is_identity() {
        assert_eq!(downmix(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }
}
