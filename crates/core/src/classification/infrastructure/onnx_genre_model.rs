/// Spectrogram CNN genre model using ONNX Runtime via `ort`.
use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;

use crate::classification::domain::genre_model::GenreModel;
use super::execution_provider::preferred_execution_providers;

pub struct OnnxGenreModel {
    // `Session::run` needs `&mut`; the lock serialises inference.
    session: Mutex<ort::session::Session>,
    input_size: Option<u32>,
}

impl OnnxGenreModel {
    /// Load the model. The input resolution is read from the model's
    /// NCHW input shape; a dynamic height is left to the caller.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            });

        match input_size {
            Some(size) => log::info!(
                "Loaded genre model {} (input {size}x{size})",
                model_path.display()
            ),
            None => log::info!("Loaded genre model {} (dynamic input)", model_path.display()),
        }
        Ok(Self {
            session: Mutex::new(session),
            input_size,
        })
    }
}

impl GenreModel for OnnxGenreModel {
    fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(input.clone())?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let logits = outputs[0].try_extract_array::<f32>()?;
        Ok(logits.iter().copied().collect())
    }

    fn input_size(&self) -> Option<u32> {
        self.input_size
    }
}
