use crate::audio::domain::audio_signal::AudioSignal;
use crate::filtering::domain::filter_spec::{validate_taps, Tap};
use crate::filtering::infrastructure::tap_delay::apply_taps;
use crate::shared::error::EngineError;

/// Concert-hall reflections: six taps, 50 ms apart, fading out.
pub const HALL_TAPS: [Tap; 6] = [
    Tap::new(0.05, 0.6),
    Tap::new(0.10, 0.5),
    Tap::new(0.15, 0.4),
    Tap::new(0.20, 0.3),
    Tap::new(0.25, 0.2),
    Tap::new(0.30, 0.1),
];

/// Tapped-delay reverb: each tap adds a delayed, scaled copy of the dry
/// signal. Length and sample rate are kept.
pub fn reverb(signal: &AudioSignal, taps: &[Tap]) -> Result<AudioSignal, EngineError> {
    validate_taps("reverb", taps)?;
    Ok(signal.with_samples(apply_taps(signal.samples(), taps, signal.sample_rate())))
}

/// Single delayed copy mixed in at `level` (slap-back doubling).
pub fn slap_delay(signal: &AudioSignal, delay: f64, level: f32) -> Result<AudioSignal, EngineError> {
    let tap = [Tap::new(delay, level)];
    validate_taps("slap_delay", &tap)?;
    Ok(signal.with_samples(apply_taps(signal.samples(), &tap, signal.sample_rate())))
}
