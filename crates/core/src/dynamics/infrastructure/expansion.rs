use crate::audio::domain::audio_signal::AudioSignal;

/// Short-time RMS per frame, frames centred on `t * hop` with zero padding.
pub fn frame_rms(samples: &[f32], frame_length: usize, hop: usize) -> Vec<f32> {
    let n = samples.len();
    let half = (frame_length / 2) as isize;
    let n_frames = n / hop + 1;
    (0..n_frames)
        .map(|t| {
            let centre = (t * hop) as isize;
            let start = (centre - half).max(0) as usize;
            let end = ((centre + half) as usize).min(n);
            let sum: f64 = samples[start.min(end)..end]
                .iter()
                .map(|&s| s as f64 * s as f64)
                .sum();
            (sum / frame_length as f64).sqrt() as f32
        })
        .collect()
}

/// RMS-driven dynamic expansion.
///
/// Frame RMS is min-max normalised to `[0, 1]`, repeated `hop` times per
/// frame to reach sample resolution, and each sample is scaled by
/// `0.5 + 0.5 * rms`. Louder passages keep their level while quiet ones
/// drop by up to half. A flat envelope (including silence) leaves the
/// signal unchanged.
pub fn rms_expand(signal: &AudioSignal, frame_length: usize, hop: usize) -> AudioSignal {
    let rms = frame_rms(signal.samples(), frame_length, hop);
    let lo = rms.iter().cloned().fold(f32::INFINITY, f32::min);
    let hi = rms.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = hi - lo;
    if !(range > f32::EPSILON) {
        return signal.clone();
    }

    let expanded = signal
        .samples()
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let level = (rms[(i / hop).min(rms.len() - 1)] - lo) / range;
            s * (0.5 + 0.5 * level)
        })
        .collect();
    signal.with_samples(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn quiet_then_loud(sr: u32) -> AudioSignal {
        let n = sr as usize;
        AudioSignal::new(
            (0..2 * n)
                .map(|i| {
                    let amp = if i < n { 0.1 } else { 0.8 };
                    amp * (2.0 * std::f32::consts::PI * 200.0 * i as f32 / sr as f32).sin()
                })
                .collect(),
            sr,
        )
    }

    #[test]
    fn test_frame_rms_of_constant() {
        let rms = frame_rms(&vec![0.5; 4096], 1024, 256);
        assert_eq!(rms.len(), 17);
        // interior frames are fully covered
        assert_abs_diff_eq!(rms[8], 0.5, epsilon = 1e-6);
        // edge frames see half padding
        assert_abs_diff_eq!(rms[0], 0.5 * 0.5f32.sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_quiet_passage_is_attenuated_loud_is_kept() {
        let signal = quiet_then_loud(8000);
        let out = rms_expand(&signal, 2048, 512);
        assert_eq!(out.len(), signal.len());
        let s = signal.samples();
        let o = out.samples();
        // middle of the quiet half: factor near 0.5
        let q = 4000;
        assert!(o[q].abs() <= 0.55 * s[q].abs() + 1e-6);
        // middle of the loud half: factor near 1.0
        let l = 12000;
        assert!(o[l].abs() >= 0.95 * s[l].abs() - 1e-6);
    }

    #[test]
    fn test_silence_is_unchanged() {
        let signal = AudioSignal::new(vec![0.0; 5000], 8000);
        assert_eq!(rms_expand(&signal, 2048, 512), signal);
    }

    #[test]
    fn test_empty_is_unchanged() {
        let signal = AudioSignal::new(Vec::new(), 8000);
        assert_eq!(rms_expand(&signal, 2048, 512), signal);
    }
}
