use crate::audio::domain::audio_signal::{fit_length, AudioSignal};
use crate::shared::error::EngineError;
use crate::spectral::infrastructure::stft::Stft;
use crate::temporal::domain::beat_track::BeatTrack;

use super::beat_tracker::BeatTracker;
use super::time_stretch::{time_stretch, RATE_RANGE};

pub const DEFAULT_SWING_RATIO: f64 = 0.92;

/// Beat-synchronous swing warp.
///
/// Every odd-indexed beat chunk is time-stretched to `ratio` of its length
/// and then padded or cut back to its original span. Chunks are added into
/// a zeroed buffer at their original offsets, so the output length always
/// equals the input length. Audio before the first beat, and any chunk that
/// would run past the end of the signal, is left silent.
pub struct SwingWarp {
    ratio: f64,
    tracker: BeatTracker,
}

impl SwingWarp {
    pub fn new(ratio: f64) -> Result<Self, EngineError> {
        // the reciprocal drives time_stretch, and RATE_RANGE is symmetric
        if !RATE_RANGE.contains(&ratio) {
            return Err(EngineError::invalid(
                "swing",
                format!("swing ratio must be in {RATE_RANGE:?}, got {ratio}"),
            ));
        }
        Ok(Self {
            ratio,
            tracker: BeatTracker::default(),
        })
    }

    pub fn apply(&self, signal: &AudioSignal, stft: &Stft) -> Result<AudioSignal, EngineError> {
        let track = self.tracker.track(signal, stft);
        if track.is_empty() {
            log::debug!("Swing: no beats detected, passing signal through");
            return Ok(signal.clone());
        }
        self.apply_with_beats(signal, &track, stft)
    }

    pub fn apply_with_beats(
        &self,
        signal: &AudioSignal,
        track: &BeatTrack,
        stft: &Stft,
    ) -> Result<AudioSignal, EngineError> {
        if track.is_empty() {
            return Ok(signal.clone());
        }

        let samples = signal.samples();
        let n = samples.len();
        let beats = track.beat_samples();
        let default_chunk = track.beat_period_samples(signal.sample_rate()).unwrap_or(0);
        let mut output = vec![0.0f32; n];

        for (i, &idx) in beats.iter().enumerate() {
            if idx >= n {
                continue;
            }
            let chunk_size = match beats.get(i + 1) {
                Some(&next) => next.saturating_sub(idx),
                None => default_chunk,
            };
            if chunk_size == 0 || idx + chunk_size > n {
                continue;
            }

            let span = &samples[idx..idx + chunk_size];
            let dest = &mut output[idx..idx + chunk_size];
            if i % 2 == 1 {
                let chunk = signal.with_samples(span.to_vec());
                let stretched = time_stretch(&chunk, 1.0 / self.ratio, stft)?;
                let fitted = fit_length(stretched.samples(), chunk_size);
                dest.iter_mut().zip(fitted).for_each(|(d, s)| *d += s);
            } else {
                dest.iter_mut().zip(span).for_each(|(d, s)| *d += s);
            }
        }

        Ok(signal.with_samples(output))
    }
}
