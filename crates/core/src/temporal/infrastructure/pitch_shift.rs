use std::f64::consts::PI;

use ndarray::Array2;
use rustfft::num_complex::Complex;

use crate::audio::domain::audio_signal::AudioSignal;
use crate::shared::error::EngineError;
use crate::spectral::infrastructure::stft::Stft;

/// Phase vocoder-based pitch shifter.
///
/// Shifts pitch by a number of semitones using
/// STFT -> frequency bin remapping -> ISTFT with overlap-add. Duration is
/// unchanged and the output peak never exceeds the input peak.
pub struct PitchShifter {
    semitones: f64,
}

impl PitchShifter {
    pub fn new(semitones: f64) -> Result<Self, EngineError> {
        if !semitones.is_finite() {
            return Err(EngineError::invalid(
                "pitch_shift",
                format!("semitones must be finite, got {semitones}"),
            ));
        }
        Ok(Self { semitones })
    }

    pub fn semitones(&self) -> f64 {
        self.semitones
    }

    pub fn shift(&self, signal: &AudioSignal, stft: &Stft) -> AudioSignal {
        // Zero semitone shift is identity
        if self.semitones.abs() < 1e-10 || signal.is_empty() {
            return signal.clone();
        }

        let ratio = 2.0_f64.powf(self.semitones / 12.0);
        let spec = stft.analyze(signal);
        let shifted = remap_bins(&spec.data, ratio, stft.hop_length(), stft.frame_length());
        let mut output = stft.inverse_transform(&shifted, signal.len());

        let input_peak = signal.peak();
        let output_peak = output.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        if output_peak > 1e-10 && output_peak > input_peak {
            let gain = input_peak / output_peak;
            output.iter_mut().for_each(|s| *s *= gain);
        }
        signal.with_samples(output)
    }
}

/// Move bin `k` to `round(k * ratio)`, keeping the strongest source when
/// several land on the same target, and rebuild phase from the scaled
/// instantaneous frequency.
fn remap_bins(
    data: &Array2<Complex<f32>>,
    ratio: f64,
    hop: usize,
    frame_length: usize,
) -> Array2<Complex<f32>> {
    let (n_bins, n_frames) = data.dim();
    let mut out = Array2::<Complex<f32>>::zeros((n_bins, n_frames));

    let expected: Vec<f64> = (0..n_bins)
        .map(|k| 2.0 * PI * k as f64 * hop as f64 / frame_length as f64)
        .collect();
    let mut prev_phase = vec![0.0f64; n_bins];
    let mut synth_phase = vec![0.0f64; n_bins];
    let mut magnitudes = vec![0.0f64; n_bins];
    let mut inst_freq = vec![0.0f64; n_bins];

    for t in 0..n_frames {
        magnitudes.iter_mut().for_each(|m| *m = 0.0);
        inst_freq.iter_mut().for_each(|f| *f = 0.0);

        for k in 0..n_bins {
            let c = data[[k, t]];
            let phase = c.arg() as f64;
            let diff = phase - prev_phase[k] - expected[k];
            let wrapped = diff - 2.0 * PI * (diff / (2.0 * PI)).round();
            prev_phase[k] = phase;

            let target = (k as f64 * ratio).round() as usize;
            let mag = c.norm() as f64;
            if target < n_bins && mag > magnitudes[target] {
                magnitudes[target] = mag;
                inst_freq[target] = (expected[k] + wrapped) * ratio;
            }
        }

        for k in 0..n_bins {
            synth_phase[k] += inst_freq[k];
            out[[k, t]] = Complex::from_polar(magnitudes[k] as f32, synth_phase[k] as f32);
        }
    }
    out
}
