//! Log-power spectrogram rendered as a square RGB image and NCHW tensor.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array4;

use crate::audio::domain::audio_signal::AudioSignal;
use crate::shared::error::ClassifierError;
use crate::spectral::infrastructure::stft::Stft;

const POWER_FLOOR: f32 = 1e-10;
const TOP_DB: f32 = 80.0;

/// Viridis anchor colours at 0, 0.25, 0.5, 0.75 and 1.
const COLORMAP: [[f32; 3]; 5] = [
    [68.0, 1.0, 84.0],
    [59.0, 82.0, 139.0],
    [33.0, 145.0, 140.0],
    [94.0, 201.0, 98.0],
    [253.0, 231.0, 37.0],
];

pub struct SpectrogramRenderer {
    stft: Stft,
    image_size: u32,
}

impl SpectrogramRenderer {
    pub fn new(stft: Stft, image_size: u32) -> Self {
        Self { stft, image_size }
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Power spectrogram in dB (top 80 dB), min-max scaled to `[0, 1]`,
    /// colour-mapped with low frequencies at the bottom, then resized to
    /// `image_size` square.
    pub fn render_image(&self, signal: &AudioSignal) -> Result<RgbImage, ClassifierError> {
        if signal.is_empty() {
            return Err(ClassifierError::ClassificationFailed(
                "cannot render an empty signal".into(),
            ));
        }
        let spec = self.stft.analyze(signal);
        let power = spec.data.mapv(|c| c.norm_sqr());
        let reference = power.iter().cloned().fold(POWER_FLOOR, f32::max);
        let db = power.mapv(|p| (10.0 * (p.max(POWER_FLOOR) / reference).log10()).max(-TOP_DB));

        let lo = db.iter().cloned().fold(f32::INFINITY, f32::min);
        let hi = db.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let range = hi - lo;

        let (n_bins, n_frames) = db.dim();
        let mut img = RgbImage::new(n_frames as u32, n_bins as u32);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let k = n_bins - 1 - y as usize;
            let v = if range > 0.0 {
                (db[[k, x as usize]] - lo) / range
            } else {
                0.0
            };
            *pixel = colormap(v);
        }

        Ok(imageops::resize(
            &img,
            self.image_size,
            self.image_size,
            FilterType::Triangle,
        ))
    }

    pub fn render_tensor(&self, signal: &AudioSignal) -> Result<Array4<f32>, ClassifierError> {
        Ok(image_to_tensor(&self.render_image(signal)?))
    }

    /// Write the rendered image (PNG by extension) for inspection.
    pub fn save(&self, signal: &AudioSignal, path: &Path) -> Result<(), ClassifierError> {
        self.render_image(signal)?
            .save(path)
            .map_err(|e| ClassifierError::ClassificationFailed(format!("{}: {e}", path.display())))
    }
}

fn colormap(v: f32) -> Rgb<u8> {
    let v = v.clamp(0.0, 1.0) * (COLORMAP.len() - 1) as f32;
    let i = (v.floor() as usize).min(COLORMAP.len() - 2);
    let t = v - i as f32;
    let (a, b) = (COLORMAP[i], COLORMAP[i + 1]);
    Rgb([0, 1, 2].map(|c| (a[c] + (b[c] - a[c]) * t).round() as u8))
}

/// NCHW `[1, 3, H, W]` with channel values scaled to `[0, 1]`.
pub fn image_to_tensor(img: &RgbImage) -> Array4<f32> {
    let (w, h) = img.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
    for (x, y, pixel) in img.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }
    tensor
}
