pub mod hpss;
pub mod spectral_ops;
pub mod stft;
