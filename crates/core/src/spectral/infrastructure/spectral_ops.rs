use std::f64::consts::PI;

use crate::audio::domain::audio_signal::AudioSignal;
use crate::shared::error::EngineError;

use super::stft::{Spectrogram, Stft};

/// Multiply every bin whose centre frequency lies in `[low_hz, high_hz)`.
pub fn apply_band_gain(spec: &mut Spectrogram, low_hz: f64, high_hz: f64, gain: f32) {
    let bins: Vec<usize> = (0..spec.n_bins())
        .filter(|&k| {
            let f = spec.bin_frequency(k);
            f >= low_hz && f < high_hz
        })
        .collect();
    for k in bins {
        spec.data.row_mut(k).mapv_inplace(|c| c * gain);
    }
}

pub fn band_gain(
    signal: &AudioSignal,
    low_hz: f64,
    high_hz: f64,
    gain: f32,
    stft: &Stft,
) -> Result<AudioSignal, EngineError> {
    validate_band(low_hz, high_hz, gain)?;
    let mut spec = stft.analyze(signal);
    apply_band_gain(&mut spec, low_hz, high_hz, gain);
    Ok(stft.synthesize(&spec))
}

pub(crate) fn validate_band(low_hz: f64, high_hz: f64, gain: f32) -> Result<(), EngineError> {
    if !low_hz.is_finite() || !high_hz.is_finite() || low_hz < 0.0 || high_hz <= low_hz {
        return Err(EngineError::invalid(
            "band_gain",
            format!("band [{low_hz}, {high_hz}) is empty or not finite"),
        ));
    }
    if !gain.is_finite() || gain < 0.0 {
        return Err(EngineError::invalid(
            "band_gain",
            format!("gain must be finite and non-negative, got {gain}"),
        ));
    }
    Ok(())
}

/// Low-frequency-oscillator cutoff sweep.
///
/// The oscillator runs at the sample rate; frame `t` reads it at sample
/// `(t * hop) % len`. Its value `0.5 + depth * sin(..)` is clamped to `[0, 1]`
/// and scaled to a bin index, and every bin below that index is multiplied
/// by `boost`.
pub fn apply_wobble(spec: &mut Spectrogram, rate_hz: f64, depth: f64, boost: f32) {
    let n_bins = spec.n_bins();
    let len = spec.signal_len().max(1);
    let sr = spec.sample_rate() as f64;
    let hop = spec.hop_length();

    for t in 0..spec.n_frames() {
        let pos = (t * hop) % len;
        let lfo = (0.5 + depth * (2.0 * PI * rate_hz * pos as f64 / sr).sin()).clamp(0.0, 1.0);
        let cutoff = ((n_bins as f64 * lfo).floor() as usize).min(n_bins - 1);
        for k in 0..cutoff {
            spec.data[[k, t]] *= boost;
        }
    }
}

pub fn wobble(
    signal: &AudioSignal,
    rate_hz: f64,
    depth: f64,
    boost: f32,
    stft: &Stft,
) -> Result<AudioSignal, EngineError> {
    validate_wobble(rate_hz, depth, boost)?;
    let mut spec = stft.analyze(signal);
    apply_wobble(&mut spec, rate_hz, depth, boost);
    Ok(stft.synthesize(&spec))
}

pub(crate) fn validate_wobble(rate_hz: f64, depth: f64, boost: f32) -> Result<(), EngineError> {
    if !rate_hz.is_finite() || rate_hz <= 0.0 {
        return Err(EngineError::invalid(
            "wobble",
            format!("rate must be positive, got {rate_hz}"),
        ));
    }
    if !depth.is_finite() || depth < 0.0 {
        return Err(EngineError::invalid(
            "wobble",
            format!("depth must be non-negative, got {depth}"),
        ));
    }
    if !boost.is_finite() || boost < 0.0 {
        return Err(EngineError::invalid(
            "wobble",
            format!("boost must be non-negative, got {boost}"),
        ));
    }
    Ok(())
}
