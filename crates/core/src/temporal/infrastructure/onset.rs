use crate::audio::domain::audio_signal::AudioSignal;
use crate::spectral::infrastructure::stft::Stft;

const POWER_FLOOR: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

/// Spectral-flux onset strength, one value per STFT frame.
///
/// Mean over bins of the half-wave-rectified frame-to-frame rise of the
/// dB power spectrogram (referenced to its maximum, clipped at -80 dB).
/// Frame 0 is always zero; a silent signal gives an all-zero envelope.
pub fn onset_envelope(signal: &AudioSignal, stft: &Stft) -> Vec<f32> {
    let spec = stft.analyze(signal);
    let power = spec.data.mapv(|c| c.norm_sqr());
    let reference = power.iter().cloned().fold(POWER_FLOOR, f32::max);
    let db = power.mapv(|p| (10.0 * (p.max(POWER_FLOOR) / reference).log10()).max(-TOP_DB));

    let (n_bins, n_frames) = db.dim();
    let mut envelope = vec![0.0f32; n_frames];
    for t in 1..n_frames {
        let rise: f32 = (0..n_bins)
            .map(|k| (db[[k, t]] - db[[k, t - 1]]).max(0.0))
            .sum();
        envelope[t] = rise / n_bins as f32;
    }
    envelope
}
