use std::f64::consts::PI;
use std::ops::RangeInclusive;

use ndarray::Array2;
use rustfft::num_complex::Complex;

use crate::audio::domain::audio_signal::AudioSignal;
use crate::shared::error::EngineError;
use crate::spectral::infrastructure::stft::Stft;

/// Output length for a stretch by `rate`. `rate > 1` is faster/shorter.
pub fn stretched_len(len: usize, rate: f64) -> usize {
    (len as f64 / rate).round() as usize
}

/// Phase-vocoder time stretch preserving pitch.
///
/// The output holds exactly `round(len / rate)` samples at the input rate.
pub fn time_stretch(signal: &AudioSignal, rate: f64, stft: &Stft) -> Result<AudioSignal, EngineError> {
    validate_rate(rate)?;
    let target = stretched_len(signal.len(), rate);
    if signal.is_empty() {
        return Ok(signal.with_samples(Vec::new()));
    }

    let spec = stft.analyze(signal);
    let stretched = phase_vocoder(&spec.data, rate, stft.hop_length(), stft.frame_length());
    Ok(signal.with_samples(stft.inverse_transform(&stretched, target)))
}

/// Stretch rates outside this range would allocate or discard almost the
/// whole signal.
pub const RATE_RANGE: RangeInclusive<f64> = 0.01..=100.0;

pub(crate) fn validate_rate(rate: f64) -> Result<(), EngineError> {
    if !RATE_RANGE.contains(&rate) {
        return Err(EngineError::invalid(
            "time_stretch",
            format!(
                "rate must be in {}..={}, got {rate}",
                RATE_RANGE.start(),
                RATE_RANGE.end()
            ),
        ));
    }
    Ok(())
}

/// Resample the frame axis at steps of `rate`, interpolating magnitudes
/// linearly and accumulating phase from the measured per-bin advance.
pub fn phase_vocoder(
    data: &Array2<Complex<f32>>,
    rate: f64,
    hop: usize,
    frame_length: usize,
) -> Array2<Complex<f32>> {
    let (n_bins, n_frames) = data.dim();
    let steps: Vec<f64> = (0usize..)
        .map(|i| i as f64 * rate)
        .take_while(|&s| s < n_frames as f64)
        .collect();
    let mut out = Array2::<Complex<f32>>::zeros((n_bins, steps.len()));
    if n_frames == 0 {
        return out;
    }

    let expected: Vec<f64> = (0..n_bins)
        .map(|k| 2.0 * PI * k as f64 * hop as f64 / frame_length as f64)
        .collect();
    let mut phase_acc: Vec<f64> = (0..n_bins).map(|k| data[[k, 0]].arg() as f64).collect();

    let frame_at = |k: usize, t: usize| -> Complex<f32> {
        if t < n_frames {
            data[[k, t]]
        } else {
            Complex::new(0.0, 0.0)
        }
    };

    for (t, &step) in steps.iter().enumerate() {
        let left = step.floor() as usize;
        let alpha = step - left as f64;
        for k in 0..n_bins {
            let a = frame_at(k, left);
            let b = frame_at(k, left + 1);
            let mag = (1.0 - alpha) * a.norm() as f64 + alpha * b.norm() as f64;
            out[[k, t]] = Complex::from_polar(mag as f32, phase_acc[k] as f32);

            let dphase = b.arg() as f64 - a.arg() as f64 - expected[k];
            let wrapped = dphase - 2.0 * PI * (dphase / (2.0 * PI)).round();
            phase_acc[k] += expected[k] + wrapped;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sine(freq: f32, len: usize, sr: u32) -> AudioSignal {
        AudioSignal::new(
            (0..len)
                .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
                .collect(),
            sr,
        )
    }

    fn zero_crossings(s: &[f32]) -> usize {
        s.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count()
    }

    #[rstest]
    #[case(0.5)]
    #[case(0.92)]
    #[case(1.0)]
    #[case(1.08)]
    #[case(2.0)]
    fn test_output_length_is_len_over_rate(#[case] rate: f64) {
        let signal = sine(440.0, 22050, 22050);
        let out = time_stretch(&signal, rate, &Stft::default()).unwrap();
        assert_eq!(out.len(), stretched_len(signal.len(), rate));
        assert_eq!(out.sample_rate(), 22050);
    }

    #[test]
    fn test_slow_down_preserves_pitch() {
        let sr = 22050;
        let signal = sine(440.0, sr as usize, sr);
        let out = time_stretch(&signal, 0.5, &Stft::default()).unwrap();
        // twice as long, same frequency: roughly twice the crossings
        let ratio = zero_crossings(out.samples()) as f64 / zero_crossings(signal.samples()) as f64;
        assert!((ratio - 2.0).abs() < 0.1, "ratio = {ratio}");
    }

    #[test]
    fn test_unit_rate_is_near_identity() {
        let signal = sine(440.0, 8192, 16000);
        let out = time_stretch(&signal, 1.0, &Stft::default()).unwrap();
        let err = signal
            .samples()
            .iter()
            .zip(out.samples())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max);
        assert!(err < 1e-3, "err = {err}");
    }

    #[test]
    fn test_empty_signal() {
        let out = time_stretch(&AudioSignal::new(Vec::new(), 8000), 1.5, &Stft::default()).unwrap();
        assert!(out.is_empty());
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::INFINITY)]
    #[case(1e-9)]
    #[case(1000.0)]
    fn test_rejects_bad_rate(#[case] rate: f64) {
        let err = time_stretch(&sine(440.0, 1000, 8000), rate, &Stft::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidFilterParameter { filter: "time_stretch", .. }));
    }
}
