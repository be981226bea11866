use crate::audio::domain::audio_signal::AudioSignal;

/// Scale so the largest absolute sample is exactly 1.0.
///
/// A silent signal (peak 0) is returned unchanged.
pub fn peak_normalize(signal: &AudioSignal) -> AudioSignal {
    let peak = signal.peak();
    if peak <= 0.0 || !peak.is_finite() {
        return signal.clone();
    }
    let scale = 1.0 / peak;
    signal.with_samples(signal.samples().iter().map(|s| s * scale).collect())
}
