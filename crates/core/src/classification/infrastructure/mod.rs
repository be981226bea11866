pub mod classifier_model;
pub mod execution_provider;
pub mod onnx_genre_model;
pub mod spectrogram_renderer;
