use std::path::Path;
use std::sync::Arc;

use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::audio_signal::AudioSignal;
use crate::classification::domain::classification_result::ClassificationResult;
use crate::classification::infrastructure::classifier_model::ClassifierModel;
use crate::classification::infrastructure::spectrogram_renderer::SpectrogramRenderer;
use crate::shared::error::ClassifierError;
use crate::spectral::infrastructure::stft::Stft;

/// Standalone genre prediction for one file, without transforming it.
pub struct ClassifyAudioUseCase {
    reader: Box<dyn AudioReader>,
    classifier: Arc<ClassifierModel>,
}

impl ClassifyAudioUseCase {
    pub fn new(reader: Box<dyn AudioReader>, classifier: Arc<ClassifierModel>) -> Self {
        Self { reader, classifier }
    }

    pub fn classify(&self, signal: &AudioSignal) -> Result<ClassificationResult, ClassifierError> {
        self.classifier.classify(signal)
    }

    pub fn classify_file(
        &self,
        path: &Path,
    ) -> Result<ClassificationResult, Box<dyn std::error::Error>> {
        let signal = self.reader.read_audio(path)?;
        log::info!(
            "Classifying {} ({:.2}s at {} Hz)",
            path.display(),
            signal.duration(),
            signal.sample_rate()
        );
        Ok(self.classify(&signal)?)
    }

    /// Write the spectrogram image the classifier sees for `input`.
    pub fn save_spectrogram(
        &self,
        input: &Path,
        output: &Path,
        stft: Stft,
        image_size: u32,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let signal = self.reader.read_audio(input)?;
        SpectrogramRenderer::new(stft, image_size).save(&signal, output)?;
        Ok(())
    }

    /// Labels the classifier reports, in model output order.
    pub fn labels(&self) -> &[String] {
        self.classifier.labels()
    }
}
