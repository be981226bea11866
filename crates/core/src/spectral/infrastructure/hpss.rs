//! Harmonic/percussive source separation by median filtering the
//! magnitude spectrogram.

use ndarray::{Array2, ArrayView1};

use crate::audio::domain::audio_signal::AudioSignal;
use crate::shared::error::EngineError;

use super::stft::Stft;

pub const DEFAULT_KERNEL_SIZE: usize = 31;
pub const DEFAULT_MASK_POWER: i32 = 2;

const MASK_FLOOR: f32 = 1e-20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Harmonic,
    Percussive,
}

/// Median-filter separator. Harmonic content is smooth across time,
/// percussive content is smooth across frequency. A `margin` above 1
/// pushes ambiguous energy out of both components.
#[derive(Debug, Clone, Copy)]
pub struct HarmonicPercussiveSeparator {
    kernel_size: usize,
    power: i32,
    margin: f32,
}

impl HarmonicPercussiveSeparator {
    pub fn new(margin: f32) -> Result<Self, EngineError> {
        Self::with_kernel(DEFAULT_KERNEL_SIZE, DEFAULT_MASK_POWER, margin)
    }

    pub fn with_kernel(kernel_size: usize, power: i32, margin: f32) -> Result<Self, EngineError> {
        if kernel_size == 0 {
            return Err(EngineError::invalid("hpss", "kernel size must be positive"));
        }
        if power < 1 {
            return Err(EngineError::invalid("hpss", "mask power must be at least 1"));
        }
        if !margin.is_finite() || margin < 1.0 {
            return Err(EngineError::invalid(
                "hpss",
                format!("margin must be >= 1, got {margin}"),
            ));
        }
        Ok(Self {
            kernel_size,
            power,
            margin,
        })
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Returns `(harmonic_mask, percussive_mask)` for a magnitude spectrogram.
    pub fn masks(&self, magnitudes: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
        let (n_bins, n_frames) = magnitudes.dim();
        let mut harm = Array2::<f32>::zeros((n_bins, n_frames));
        let mut perc = Array2::<f32>::zeros((n_bins, n_frames));

        for k in 0..n_bins {
            let row = median_filter(magnitudes.row(k), self.kernel_size);
            harm.row_mut(k).assign(&ArrayView1::from(row.as_slice()));
        }
        for t in 0..n_frames {
            let col = median_filter(magnitudes.column(t), self.kernel_size);
            perc.column_mut(t).assign(&ArrayView1::from(col.as_slice()));
        }

        let harm_mask = soft_mask(&harm, &perc, self.margin, self.power);
        let perc_mask = soft_mask(&perc, &harm, self.margin, self.power);
        (harm_mask, perc_mask)
    }

    pub fn separate(
        &self,
        signal: &AudioSignal,
        stft: &Stft,
    ) -> (AudioSignal, AudioSignal) {
        let spec = stft.analyze(signal);
        let (harm_mask, perc_mask) = self.masks(&spec.magnitudes());

        let mut harmonic = spec.clone();
        harmonic
            .data
            .zip_mut_with(&harm_mask, |c, &m| *c = *c * m);
        let mut percussive = spec;
        percussive
            .data
            .zip_mut_with(&perc_mask, |c, &m| *c = *c * m);

        (stft.synthesize(&harmonic), stft.synthesize(&percussive))
    }

    pub fn extract(&self, signal: &AudioSignal, component: Component, stft: &Stft) -> AudioSignal {
        let spec = stft.analyze(signal);
        let (harm_mask, perc_mask) = self.masks(&spec.magnitudes());
        let mask = match component {
            Component::Harmonic => harm_mask,
            Component::Percussive => perc_mask,
        };
        let mut masked = spec;
        masked.data.zip_mut_with(&mask, |c, &m| *c = *c * m);
        stft.synthesize(&masked)
    }
}

/// `x^p / (x^p + (margin * reference)^p)`, zero where both are negligible.
fn soft_mask(x: &Array2<f32>, reference: &Array2<f32>, margin: f32, power: i32) -> Array2<f32> {
    let mut mask = Array2::<f32>::zeros(x.dim());
    ndarray::Zip::from(&mut mask)
        .and(x)
        .and(reference)
        .for_each(|m, &a, &r| {
            let r = r * margin;
            let z = a.max(r);
            if z < MASK_FLOOR {
                *m = 0.0;
                return;
            }
            let a = (a / z).powi(power);
            let r = (r / z).powi(power);
            *m = a / (a + r);
        });
    mask
}

/// Sliding median with reflected edges.
fn median_filter(input: ArrayView1<f32>, kernel: usize) -> Vec<f32> {
    let n = input.len();
    if n == 0 {
        return Vec::new();
    }
    let half = kernel as isize / 2;
    let mut window = Vec::with_capacity(kernel);
    (0..n as isize)
        .map(|i| {
            window.clear();
            window.extend(
                (i - half..i - half + kernel as isize).map(|j| input[reflect_index(j, n)]),
            );
            let mid = window.len() / 2;
            let (_, median, _) = window.select_nth_unstable_by(mid, f32::total_cmp);
            *median
        })
        .collect()
}

/// Half-sample symmetric reflection (`d c b a | a b c d | d c b a`).
fn reflect_index(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}
