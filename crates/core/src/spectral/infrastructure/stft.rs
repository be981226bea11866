//! Short-time Fourier analysis/synthesis with centred frames.

use std::f32::consts::PI;
use std::sync::Arc;

use ndarray::Array2;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::audio::domain::audio_signal::AudioSignal;
use crate::shared::constants::{FRAME_LENGTH, HOP_LENGTH};

/// Window-sum values below this are treated as uncovered.
const WINDOW_SUM_FLOOR: f32 = 1e-8;

/// Complex spectrogram indexed `[bin, frame]`, with enough context to
/// synthesize back to the signal it came from.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub data: Array2<Complex<f32>>,
    sample_rate: u32,
    signal_len: usize,
    frame_length: usize,
    hop_length: usize,
}

impl Spectrogram {
    pub fn n_bins(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_frames(&self) -> usize {
        self.data.ncols()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn signal_len(&self) -> usize {
        self.signal_len
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// Centre frequency of bin `k` in Hz.
    pub fn bin_frequency(&self, k: usize) -> f64 {
        k as f64 * self.sample_rate as f64 / self.frame_length as f64
    }

    pub fn magnitudes(&self) -> Array2<f32> {
        self.data.mapv(|c| c.norm())
    }
}

/// Periodic-Hann STFT engine. Frame `t` is centred on sample `t * hop`.
pub struct Stft {
    frame_length: usize,
    hop_length: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Default for Stft {
    fn default() -> Self {
        Self::new(FRAME_LENGTH, HOP_LENGTH)
    }
}

impl Stft {
    pub fn new(frame_length: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            frame_length,
            hop_length,
            window: hann(frame_length),
            forward: planner.plan_fft_forward(frame_length),
            inverse: planner.plan_fft_inverse(frame_length),
        }
    }

    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn n_bins(&self) -> usize {
        self.frame_length / 2 + 1
    }

    /// Number of frames needed to cover `len` samples.
    pub fn n_frames_for(&self, len: usize) -> usize {
        len.div_ceil(self.hop_length) + 1
    }

    pub fn analyze(&self, signal: &AudioSignal) -> Spectrogram {
        Spectrogram {
            data: self.forward_transform(signal.samples()),
            sample_rate: signal.sample_rate(),
            signal_len: signal.len(),
            frame_length: self.frame_length,
            hop_length: self.hop_length,
        }
    }

    /// Overlap-add back to a signal of the analysed length.
    pub fn synthesize(&self, spec: &Spectrogram) -> AudioSignal {
        AudioSignal::new(
            self.inverse_transform(&spec.data, spec.signal_len),
            spec.sample_rate,
        )
    }

    pub fn forward_transform(&self, samples: &[f32]) -> Array2<Complex<f32>> {
        let n_frames = self.n_frames_for(samples.len());
        let half = self.frame_length / 2;
        let padded_len = (n_frames - 1) * self.hop_length + self.frame_length;
        let mut padded = vec![0.0f32; padded_len.max(samples.len() + self.frame_length)];
        padded[half..half + samples.len()].copy_from_slice(samples);

        let n_bins = self.n_bins();
        let mut data = Array2::<Complex<f32>>::zeros((n_bins, n_frames));
        let mut buf = vec![Complex::new(0.0f32, 0.0); self.frame_length];

        for t in 0..n_frames {
            let start = t * self.hop_length;
            for (i, slot) in buf.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * self.window[i], 0.0);
            }
            self.forward.process(&mut buf);
            for k in 0..n_bins {
                data[[k, t]] = buf[k];
            }
        }
        data
    }

    /// Inverse transform with squared-window normalization, trimmed or
    /// zero-padded to exactly `length` samples.
    pub fn inverse_transform(&self, data: &Array2<Complex<f32>>, length: usize) -> Vec<f32> {
        let (n_bins, n_frames) = data.dim();
        let half = self.frame_length / 2;
        let out_len = (n_frames.max(1) - 1) * self.hop_length + self.frame_length;
        let mut output = vec![0.0f32; out_len];
        let mut window_sum = vec![0.0f32; out_len];
        let mut buf = vec![Complex::new(0.0f32, 0.0); self.frame_length];
        let norm = 1.0 / self.frame_length as f32;

        for t in 0..n_frames {
            buf.iter_mut().for_each(|c| *c = Complex::new(0.0, 0.0));
            for k in 0..n_bins.min(self.n_bins()) {
                buf[k] = data[[k, t]];
            }
            // Conjugate symmetry for a real-valued frame
            for k in 1..self.frame_length - half {
                buf[self.frame_length - k] = buf[k].conj();
            }
            self.inverse.process(&mut buf);

            let start = t * self.hop_length;
            for i in 0..self.frame_length {
                let w = self.window[i];
                output[start + i] += buf[i].re * norm * w;
                window_sum[start + i] += w * w;
            }
        }

        for (o, &ws) in output.iter_mut().zip(window_sum.iter()) {
            if ws > WINDOW_SUM_FLOOR {
                *o /= ws;
            } else {
                *o = 0.0;
            }
        }

        let mut trimmed: Vec<f32> = output.into_iter().skip(half).take(length).collect();
        trimmed.resize(length, 0.0);
        trimmed
    }
}

/// Periodic Hann window.
pub fn hann(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}
