use crate::audio::domain::audio_signal::AudioSignal;
use crate::filtering::domain::filter_spec::{FilterChainSpec, FilterKind};
use crate::shared::error::EngineError;

use super::biquad::{Biquad, BiquadCascade};
use super::compander::Compander;
use super::tap_delay::apply_taps;

/// Validate the whole chain, then run each filter in order.
///
/// Validation happens up front; a chain with any bad parameter is rejected
/// before the first filter runs.
pub fn apply_filter_chain(
    signal: &AudioSignal,
    chain: &FilterChainSpec,
) -> Result<AudioSignal, EngineError> {
    chain.validate(signal.sample_rate())?;

    let mut current = signal.clone();
    for filter in chain.filters() {
        current = apply_filter(&current, filter);
        current.ensure_finite(filter.name())?;
    }
    Ok(current)
}

/// Apply one already-validated filter.
pub fn apply_filter(signal: &AudioSignal, filter: &FilterKind) -> AudioSignal {
    let sr = signal.sample_rate();
    let samples = signal.samples();
    let out = match filter {
        FilterKind::Gain(g) => samples.iter().map(|&s| s * g).collect(),
        FilterKind::EqBand {
            center_hz,
            width_octaves,
            gain_db,
        } => {
            let mut section = Biquad::peaking(*center_hz, *width_octaves, *gain_db, sr as f64);
            samples
                .iter()
                .map(|&s| section.process_sample(s as f64) as f32)
                .collect()
        }
        FilterKind::Highpass { cutoff_hz } => {
            BiquadCascade::butterworth_highpass(*cutoff_hz, sr as f64).process(samples)
        }
        FilterKind::Lowpass { cutoff_hz } => {
            BiquadCascade::butterworth_lowpass(*cutoff_hz, sr as f64).process(samples)
        }
        FilterKind::Compressor(params) => Compander::new(params, sr).process(samples),
        FilterKind::MultiTapEcho(taps) => apply_taps(samples, taps, sr),
    };
    signal.with_samples(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::domain::filter_spec::Tap;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn sine(freq: f64, sr: u32, secs: f64) -> AudioSignal {
        let len = (secs * sr as f64) as usize;
        AudioSignal::new(
            (0..len)
                .map(|i| (2.0 * PI * freq * i as f64 / sr as f64).sin() as f32 * 0.5)
                .collect(),
            sr,
        )
    }

    #[test]
    fn test_filters_apply_in_order() {
        let signal = AudioSignal::new(vec![1.0, 0.0, 0.0, 0.0], 4);
        // echo then gain: the echo is scaled too
        let chain = FilterChainSpec::new(vec![
            FilterKind::MultiTapEcho(vec![Tap::new(0.5, 0.5)]),
            FilterKind::Gain(2.0),
        ]);
        let out = apply_filter_chain(&signal, &chain).unwrap();
        assert_eq!(out.samples(), &[2.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_invalid_chain_rejected_before_processing() {
        let signal = sine(440.0, 22050, 0.1);
        let chain = FilterChainSpec::new(vec![
            FilterKind::Gain(2.0),
            FilterKind::Highpass { cutoff_hz: 20_000.0 },
        ]);
        let err = apply_filter_chain(&signal, &chain).unwrap_err();
        assert!(matches!(err, EngineError::InvalidFilterParameter { filter: "highpass", .. }));
    }

    #[test]
    fn test_lowpass_attenuates_high_tone() {
        let signal = sine(6000.0, 22050, 0.5);
        let chain = FilterChainSpec::new(vec![FilterKind::Lowpass { cutoff_hz: 500.0 }]);
        let out = apply_filter_chain(&signal, &chain).unwrap();
        assert!(out.samples()[2000..].iter().all(|s| s.abs() < 0.01));
    }

    #[test]
    fn test_eq_band_boosts_center_tone() {
        let signal = sine(1000.0, 22050, 0.5);
        let chain = FilterChainSpec::new(vec![FilterKind::EqBand {
            center_hz: 1000.0,
            width_octaves: 2.0,
            gain_db: 6.0,
        }]);
        let out = apply_filter_chain(&signal, &chain).unwrap();
        let peak = out.samples()[5000..].iter().fold(0.0f32, |a, s| a.max(s.abs()));
        // +6 dB on a 0.5 amplitude tone
        assert_abs_diff_eq!(peak, 0.5 * 10f32.powf(6.0 / 20.0), epsilon = 0.01);
    }

    #[test]
    fn test_output_keeps_sample_rate_and_length() {
        let signal = sine(220.0, 16000, 0.25);
        let chain = FilterChainSpec::new(vec![
            FilterKind::Highpass { cutoff_hz: 60.0 },
            FilterKind::Gain(1.5),
        ]);
        let out = apply_filter_chain(&signal, &chain).unwrap();
        assert_eq!(out.sample_rate(), 16000);
        assert_eq!(out.len(), signal.len());
    }

    #[test]
    fn test_input_is_not_mutated() {
        let signal = sine(220.0, 8000, 0.1);
        let before = signal.clone();
        let chain = FilterChainSpec::new(vec![FilterKind::Gain(3.0)]);
        let _ = apply_filter_chain(&signal, &chain).unwrap();
        assert_eq!(signal, before);
    }
}
