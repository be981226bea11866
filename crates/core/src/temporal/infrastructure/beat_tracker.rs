//! Global tempo estimation and beat placement over an onset envelope.

use crate::audio::domain::audio_signal::AudioSignal;
use crate::spectral::infrastructure::stft::Stft;
use crate::temporal::domain::beat_track::BeatTrack;

use super::onset::onset_envelope;

pub const MIN_BPM: f64 = 40.0;
pub const MAX_BPM: f64 = 240.0;
pub const PRIOR_BPM: f64 = 120.0;
/// Width of the tempo prior in octaves.
const PRIOR_OCTAVES: f64 = 1.0;
/// Beat search window as a fraction of the beat period.
const BEAT_TOLERANCE: f64 = 0.1;

pub struct BeatTracker {
    min_bpm: f64,
    max_bpm: f64,
}

impl Default for BeatTracker {
    fn default() -> Self {
        Self {
            min_bpm: MIN_BPM,
            max_bpm: MAX_BPM,
        }
    }
}

impl BeatTracker {
    pub fn track(&self, signal: &AudioSignal, stft: &Stft) -> BeatTrack {
        let envelope = onset_envelope(signal, stft);
        self.track_envelope(&envelope, signal.sample_rate(), stft.hop_length())
    }

    pub fn track_envelope(&self, envelope: &[f32], sample_rate: u32, hop: usize) -> BeatTrack {
        let Some(tempo) = self.estimate_tempo(envelope, sample_rate, hop) else {
            log::debug!("No tempo found in onset envelope of {} frames", envelope.len());
            return BeatTrack::empty(hop);
        };
        let period = frames_per_beat(tempo, sample_rate, hop);
        BeatTrack {
            tempo_bpm: tempo,
            beat_frames: place_beats(envelope, period),
            hop_length: hop,
        }
    }

    /// Autocorrelation peak within the BPM range, weighted by a log-normal
    /// prior around 120 BPM. `None` when the envelope carries no energy or
    /// is too short to hold one period.
    pub fn estimate_tempo(&self, envelope: &[f32], sample_rate: u32, hop: usize) -> Option<f64> {
        if envelope.iter().all(|&v| v <= 0.0) {
            return None;
        }
        let frame_rate = sample_rate as f64 / hop as f64;
        let min_lag = ((60.0 * frame_rate / self.max_bpm).floor() as usize).max(1);
        let max_lag = ((60.0 * frame_rate / self.min_bpm).ceil() as usize).min(envelope.len().saturating_sub(1));
        if min_lag > max_lag {
            return None;
        }

        let mean = envelope.iter().map(|&v| v as f64).sum::<f64>() / envelope.len() as f64;
        let centred: Vec<f64> = envelope.iter().map(|&v| v as f64 - mean).collect();

        let mut best: Option<(usize, f64)> = None;
        for lag in min_lag..=max_lag {
            let ac: f64 = centred[lag..]
                .iter()
                .zip(centred.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / (centred.len() - lag) as f64;
            if ac <= 0.0 {
                continue;
            }
            let bpm = 60.0 * frame_rate / lag as f64;
            let score = ac * tempo_prior(bpm);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((lag, score));
            }
        }
        best.map(|(lag, _)| 60.0 * frame_rate / lag as f64)
    }
}

fn tempo_prior(bpm: f64) -> f64 {
    let octaves = (bpm / PRIOR_BPM).log2() / PRIOR_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

pub fn frames_per_beat(tempo_bpm: f64, sample_rate: u32, hop: usize) -> usize {
    let frames = 60.0 * sample_rate as f64 / (hop as f64 * tempo_bpm);
    (frames.round() as usize).max(1)
}

/// Anchor on the strongest onset, then step one period forward and
/// backward, snapping each beat to the strongest onset within the window.
pub fn place_beats(envelope: &[f32], period: usize) -> Vec<usize> {
    let len = envelope.len() as isize;
    let Some(anchor) = argmax(envelope, 0, len - 1) else {
        return Vec::new();
    };
    if envelope[anchor as usize] <= 0.0 {
        return Vec::new();
    }

    let period = period as isize;
    let tol = ((period as f64 * BEAT_TOLERANCE).round() as isize).min(period - 1);
    let mut beats = vec![anchor as usize];

    let mut idx = anchor;
    while idx + period < len {
        let target = idx + period;
        let Some(next) = argmax(envelope, (target - tol).max(idx + 1), (target + tol).min(len - 1)) else {
            break;
        };
        beats.push(next as usize);
        idx = next;
    }

    let mut idx = anchor;
    while idx - period >= 0 {
        let target = idx - period;
        let Some(prev) = argmax(envelope, (target - tol).max(0), (target + tol).min(idx - 1)) else {
            break;
        };
        beats.push(prev as usize);
        idx = prev;
    }

    beats.sort_unstable();
    beats.dedup();
    beats
}

/// Index of the largest value in `[start, end]`, first one on ties.
fn argmax(values: &[f32], start: isize, end: isize) -> Option<isize> {
    if start > end || start < 0 || end as usize >= values.len() {
        return None;
    }
    let mut best = start;
    for i in start..=end {
        if values[i as usize] > values[best as usize] {
            best = i;
        }
    }
    Some(best)
}
