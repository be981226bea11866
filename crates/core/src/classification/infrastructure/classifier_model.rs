//! Process-wide genre classifier with a one-shot lazy load.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use crate::audio::domain::audio_signal::AudioSignal;
use crate::classification::domain::classification_result::{softmax_argmax, ClassificationResult};
use crate::classification::domain::genre_model::GenreModel;
use crate::classification::domain::label_table::LabelTable;
use crate::shared::config::EngineConfig;
use crate::shared::constants::{
    CLASSIFIER_IMAGE_SIZE, CLASSIFIER_LABELS_NAME, CLASSIFIER_MODEL_NAME, FRAME_LENGTH,
    HOP_LENGTH,
};
use crate::shared::error::{ClassifierError, ConfigError};
use crate::shared::model_resolver;
use crate::spectral::infrastructure::stft::Stft;

use super::onnx_genre_model::OnnxGenreModel;
use super::spectrogram_renderer::SpectrogramRenderer;

/// Builds the model on first use.
pub type ModelLoader =
    Box<dyn Fn() -> Result<Box<dyn GenreModel>, String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// Not loaded yet, or the load failed.
    Unloaded,
    /// Weights in memory; no inference has completed.
    Loaded,
    /// At least one inference produced output matching the label table.
    Ready,
}

const UNLOADED: u8 = 0;
const LOADED: u8 = 1;
const READY: u8 = 2;

/// Lifecycle `Unloaded -> Loaded -> Ready`. The load runs at most once,
/// even under concurrent first use; a failed load is remembered and every
/// later call reports `ModelUnavailable` without retrying.
pub struct ClassifierModel {
    loader: ModelLoader,
    model: OnceLock<Result<Box<dyn GenreModel>, ClassifierError>>,
    state: AtomicU8,
    labels: LabelTable,
    frame_length: usize,
    hop_length: usize,
    /// Render size for models whose input shape is dynamic.
    image_size: u32,
}

impl ClassifierModel {
    pub fn new(loader: ModelLoader, labels: LabelTable) -> Self {
        Self {
            loader,
            model: OnceLock::new(),
            state: AtomicU8::new(UNLOADED),
            labels,
            frame_length: FRAME_LENGTH,
            hop_length: HOP_LENGTH,
            image_size: CLASSIFIER_IMAGE_SIZE,
        }
    }

    /// ONNX model at `path`, loaded on first use.
    pub fn from_path(path: PathBuf, labels: LabelTable) -> Self {
        Self::new(
            Box::new(move || -> Result<Box<dyn GenreModel>, String> {
                OnnxGenreModel::new(&path)
                    .map(|m| Box::new(m) as Box<dyn GenreModel>)
                    .map_err(|e| e.to_string())
            }),
            labels,
        )
    }

    /// Resolve the model file and label table from `config`.
    ///
    /// A model that cannot be found is not an error here; it surfaces as
    /// `ModelUnavailable` on first use.
    pub fn from_config(
        config: &EngineConfig,
        bundled_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let resolved = model_resolver::resolve(
            CLASSIFIER_MODEL_NAME,
            config.model_path.as_deref(),
            bundled_dir,
        );
        // explicit labels win, then a label file shipped beside the model
        let labels_path = config.labels_path.clone().or_else(|| {
            resolved
                .as_ref()
                .ok()
                .map(|model| model.with_file_name(CLASSIFIER_LABELS_NAME))
                .filter(|path| path.exists())
        });
        let labels = match labels_path {
            Some(path) => {
                log::debug!("Using classifier labels from {}", path.display());
                LabelTable::new(EngineConfig::load_labels(&path)?).unwrap_or_default()
            }
            None => LabelTable::default(),
        };
        let mut classifier = match resolved {
            Ok(path) => Self::from_path(path, labels),
            Err(e) => {
                let reason = e.to_string();
                Self::new(
                    Box::new(move || -> Result<Box<dyn GenreModel>, String> {
                        Err(reason.clone())
                    }),
                    labels,
                )
            }
        };
        classifier.frame_length = config.frame_length;
        classifier.hop_length = config.hop_length;
        classifier.image_size = config.image_size;
        Ok(classifier)
    }

    pub fn state(&self) -> ModelState {
        match self.state.load(Ordering::Acquire) {
            READY => ModelState::Ready,
            LOADED => ModelState::Loaded,
            _ => ModelState::Unloaded,
        }
    }

    /// Override the render size used when the model's input is dynamic.
    pub fn with_image_size(mut self, image_size: u32) -> Self {
        self.image_size = image_size;
        self
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    pub fn labels(&self) -> &[String] {
        self.labels.labels()
    }

    /// Force the load now.
    pub fn load(&self) -> Result<(), ClassifierError> {
        self.model().map(|_| ())
    }

    fn model(&self) -> Result<&dyn GenreModel, ClassifierError> {
        let loaded = self.model.get_or_init(|| match (self.loader)() {
            Ok(model) => {
                self.state.store(LOADED, Ordering::Release);
                Ok(model)
            }
            Err(reason) => {
                log::warn!("Genre classifier unavailable: {reason}");
                Err(ClassifierError::ModelUnavailable(reason))
            }
        });
        match loaded {
            Ok(model) => Ok(model.as_ref()),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn classify(&self, signal: &AudioSignal) -> Result<ClassificationResult, ClassifierError> {
        let model = self.model()?;
        let renderer = SpectrogramRenderer::new(
            Stft::new(self.frame_length, self.hop_length),
            model.input_size().unwrap_or(self.image_size),
        );
        let tensor = renderer.render_tensor(signal)?;
        let logits = model
            .infer(&tensor)
            .map_err(|e| ClassifierError::ClassificationFailed(e.to_string()))?;

        if logits.len() != self.labels.len() {
            return Err(ClassifierError::ClassificationFailed(format!(
                "model produced {} outputs for {} labels",
                logits.len(),
                self.labels.len()
            )));
        }
        let (index, confidence) = softmax_argmax(&logits).ok_or_else(|| {
            ClassifierError::ClassificationFailed("model output is empty or non-finite".into())
        })?;
        let label = self.labels.get(index).ok_or_else(|| {
            ClassifierError::ClassificationFailed(format!("no label for index {index}"))
        })?;

        self.state.store(READY, Ordering::Release);
        log::debug!("Classified as {label} ({confidence:.3})");
        Ok(ClassificationResult {
            label: label.to_string(),
            confidence,
        })
    }
}
