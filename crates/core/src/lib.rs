//! Genre transformation engine: filter chains, spectral and temporal
//! stages, dynamics, and a spectrogram-CNN genre classifier.

pub mod audio;
pub mod classification;
pub mod dynamics;
pub mod filtering;
pub mod pipeline;
pub mod shared;
pub mod spectral;
pub mod temporal;
