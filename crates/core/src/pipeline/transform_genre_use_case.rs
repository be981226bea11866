use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::audio::domain::audio_reader::AudioReader;
use crate::audio::domain::audio_signal::AudioSignal;
use crate::audio::domain::audio_writer::AudioWriter;
use crate::audio::domain::genre::Genre;
use crate::classification::domain::classification_result::ClassificationResult;
use crate::classification::infrastructure::classifier_model::ClassifierModel;
use crate::dynamics::infrastructure::normalize::peak_normalize;
use crate::filtering::domain::filter_spec::FilterChainSpec;
use crate::filtering::infrastructure::filter_chain::apply_filter_chain;
use crate::shared::constants::{FRAME_LENGTH, HOP_LENGTH};
use crate::shared::error::{AudioIoError, ClassifierError, EngineError};

use super::genre_profile::GenreProfile;
use super::pipeline_logger::{PipelineLogger, INPUT_SECONDS_METRIC};
use super::stage_op::{StageContext, StageOp};
use super::transformation_outcome::TransformationOutcome;

/// Runs a genre profile over a signal and attaches the classifier's view
/// of the original input.
///
/// Per invocation: genre lookup, up-front validation of every filter and
/// stage, the filter chain, each profile stage in order, then peak
/// normalization. Classification runs on a scoped thread alongside the
/// stages; its failure only removes the prediction.
pub struct TransformGenreUseCase {
    reader: Box<dyn AudioReader>,
    writer: Box<dyn AudioWriter>,
    classifier: Option<Arc<ClassifierModel>>,
    frame_length: usize,
    hop_length: usize,
}

impl TransformGenreUseCase {
    pub fn new(
        reader: Box<dyn AudioReader>,
        writer: Box<dyn AudioWriter>,
        classifier: Option<Arc<ClassifierModel>>,
    ) -> Self {
        Self {
            reader,
            writer,
            classifier,
            frame_length: FRAME_LENGTH,
            hop_length: HOP_LENGTH,
        }
    }

    /// Override the STFT frame and hop used by spectral stages.
    pub fn with_analysis(mut self, frame_length: usize, hop_length: usize) -> Self {
        self.frame_length = frame_length;
        self.hop_length = hop_length;
        self
    }

    /// Transform an in-memory signal to `genre`.
    pub fn transform(
        &self,
        signal: &AudioSignal,
        genre: &str,
        logger: &mut dyn PipelineLogger,
    ) -> TransformationOutcome {
        let genre = match genre.parse::<Genre>() {
            Ok(g) => g,
            Err(e) => return reject(e),
        };
        if signal.is_empty() {
            return reject(EngineError::EmptySignal);
        }
        let profile = GenreProfile::for_genre(genre);
        if let Err(e) = profile.validate(signal.sample_rate()) {
            return reject(e);
        }
        let chain = profile.filter_chain_for(signal.sample_rate());

        logger.info(&format!(
            "Transforming {:.2}s to {genre}: {} filters, {} stages",
            signal.duration(),
            chain.filters().len(),
            profile.stages.len()
        ));

        let (rendered, classification) = std::thread::scope(|s| {
            let pending = self
                .classifier
                .as_deref()
                .map(|classifier| s.spawn(move || classifier.classify(signal)));
            let rendered = self.run_stages(signal, &chain, &profile.stages, logger);
            let classification = pending.and_then(|handle| collect_classification(handle.join()));
            (rendered, classification)
        });

        match rendered {
            Ok(output) => {
                logger.info(&format!("Transform to {genre} complete"));
                TransformationOutcome::succeeded(output, classification)
            }
            Err(e) => {
                let mut outcome = TransformationOutcome::failed(e);
                outcome.classification = classification;
                outcome
            }
        }
    }

    /// Read `input`, transform it and write 16-bit mono PCM to `output`.
    ///
    /// The genre is checked before the input is opened. The output is
    /// staged in a uniquely named file beside `output` and renamed into
    /// place only once fully written; the staging file is removed on
    /// every failure path.
    pub fn transform_file(
        &self,
        input: &Path,
        output: &Path,
        genre: &str,
        logger: &mut dyn PipelineLogger,
    ) -> TransformationOutcome {
        if let Err(e) = genre.parse::<Genre>() {
            return reject(e);
        }
        let signal = match self.reader.read_audio(input) {
            Ok(s) => s,
            Err(e) => return reject(e.into()),
        };
        logger.metric(INPUT_SECONDS_METRIC, signal.duration());

        let mut outcome = self.transform(&signal, genre, logger);
        if let Some(rendered) = outcome.output.as_ref() {
            let start = Instant::now();
            match self.persist(output, rendered) {
                Ok(()) => outcome.output_path = Some(output.to_path_buf()),
                Err(e) => {
                    log::error!("Writing {} failed: {e}", output.display());
                    outcome.error = Some(e);
                }
            }
            logger.timing("write", start.elapsed().as_secs_f64() * 1000.0);
        }
        logger.summary();
        outcome
    }

    fn run_stages(
        &self,
        signal: &AudioSignal,
        chain: &FilterChainSpec,
        stages: &[StageOp],
        logger: &mut dyn PipelineLogger,
    ) -> Result<AudioSignal, EngineError> {
        let ctx = StageContext::new(self.frame_length, self.hop_length);
        let total = stages.len() + 2;

        let mut current = run_stage("filter_chain", logger, || apply_filter_chain(signal, chain))?;
        logger.progress(1, total);
        for (i, op) in stages.iter().enumerate() {
            current = run_stage(op.name(), logger, || op.apply(&current, &ctx))?;
            logger.progress(i + 2, total);
        }
        let normalized = run_stage("normalize", logger, || Ok(peak_normalize(&current)))?;
        logger.progress(total, total);
        logger.metric("output_seconds", normalized.duration());
        Ok(normalized)
    }

    fn persist(&self, output: &Path, signal: &AudioSignal) -> Result<(), EngineError> {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let staged = tempfile::Builder::new()
            .prefix(".genreshift-")
            .suffix(".wav")
            .tempfile_in(dir)
            .map_err(|source| AudioIoError::Staging {
                path: dir.to_path_buf(),
                source,
            })?
            .into_temp_path();

        self.writer.write_audio(&staged, signal)?;
        staged.persist(output).map_err(|e| AudioIoError::Staging {
            path: output.to_path_buf(),
            source: e.error,
        })?;
        Ok(())
    }
}

fn reject(error: EngineError) -> TransformationOutcome {
    log::error!("Transform rejected: {error}");
    TransformationOutcome::failed(error)
}

/// Run one stage, timing it and converting errors and panics into a
/// `SignalProcessingFailure` naming the stage.
fn run_stage<F>(
    stage: &str,
    logger: &mut dyn PipelineLogger,
    f: F,
) -> Result<AudioSignal, EngineError>
where
    F: FnOnce() -> Result<AudioSignal, EngineError>,
{
    let start = Instant::now();
    let result = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(out)) => out.ensure_finite(stage).map(|()| out),
        Ok(Err(e @ EngineError::SignalProcessingFailure { .. })) => Err(e),
        Ok(Err(e)) => Err(EngineError::stage_failure(stage, e.to_string())),
        Err(payload) => Err(EngineError::stage_failure(stage, panic_message(&*payload))),
    };
    logger.timing(stage, start.elapsed().as_secs_f64() * 1000.0);
    if let Err(e) = &result {
        log::error!("Stage {stage} failed: {e}");
    }
    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "stage panicked".to_string()
    }
}

fn collect_classification(
    joined: std::thread::Result<Result<ClassificationResult, ClassifierError>>,
) -> Option<ClassificationResult> {
    match joined {
        Ok(Ok(result)) => Some(result),
        Ok(Err(e)) => {
            log::warn!("Continuing without classification: {e}");
            None
        }
        Err(payload) => {
            log::warn!("Classifier panicked: {}", panic_message(&*payload));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::domain::genre_model::GenreModel;
    use crate::classification::domain::label_table::LabelTable;
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StdoutPipelineLogger};
    use approx::assert_abs_diff_eq;
    use ndarray::Array4;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    // ─── Stubs ───

    struct StubAudioReader {
        signal: AudioSignal,
        reads: Arc<AtomicUsize>,
    }

    impl AudioReader for StubAudioReader {
        fn read_audio(&self, _: &Path) -> Result<AudioSignal, AudioIoError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.signal.clone())
        }
    }

    struct StubAudioWriter {
        written: Arc<Mutex<Option<AudioSignal>>>,
        fail: bool,
    }

    impl AudioWriter for StubAudioWriter {
        fn write_audio(&self, path: &Path, signal: &AudioSignal) -> Result<(), AudioIoError> {
            if self.fail {
                return Err(AudioIoError::Unsupported {
                    path: path.to_path_buf(),
                    reason: "disk full".into(),
                });
            }
            *self.written.lock().unwrap() = Some(signal.clone());
            Ok(())
        }
    }

    struct StubModel;

    impl GenreModel for StubModel {
        fn infer(&self, _: &Array4<f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            Ok((0..10).map(|i| if i == 1 { 3.0 } else { 0.0 }).collect())
        }

        fn input_size(&self) -> Option<u32> {
            Some(16)
        }
    }

    fn sine(seconds: f64, sample_rate: u32) -> AudioSignal {
        let len = (seconds * sample_rate as f64) as usize;
        AudioSignal::new(
            (0..len)
                .map(|i| {
                    let t = i as f32 / sample_rate as f32;
                    0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                        + 0.1 * (2.0 * std::f32::consts::PI * 880.0 * t).sin()
                })
                .collect(),
            sample_rate,
        )
    }

    struct Fixture {
        use_case: TransformGenreUseCase,
        reads: Arc<AtomicUsize>,
        written: Arc<Mutex<Option<AudioSignal>>>,
    }

    fn fixture(signal: AudioSignal, classifier: Option<Arc<ClassifierModel>>, fail_write: bool) -> Fixture {
        let reads = Arc::new(AtomicUsize::new(0));
        let written = Arc::new(Mutex::new(None));
        let use_case = TransformGenreUseCase::new(
            Box::new(StubAudioReader {
                signal,
                reads: Arc::clone(&reads),
            }),
            Box::new(StubAudioWriter {
                written: Arc::clone(&written),
                fail: fail_write,
            }),
            classifier,
        );
        Fixture {
            use_case,
            reads,
            written,
        }
    }

    fn unavailable_classifier() -> Arc<ClassifierModel> {
        Arc::new(ClassifierModel::new(
            Box::new(|| -> Result<Box<dyn GenreModel>, String> { Err("no model file".into()) }),
            LabelTable::default(),
        ))
    }

    fn stub_classifier() -> Arc<ClassifierModel> {
        Arc::new(ClassifierModel::new(
            Box::new(|| -> Result<Box<dyn GenreModel>, String> { Ok(Box::new(StubModel)) }),
            LabelTable::default(),
        ))
    }

    #[test]
    fn test_unknown_genre_rejected_before_any_io() {
        let fx = fixture(sine(0.5, 22050), None, false);
        let dir = TempDir::new().unwrap();
        let outcome = fx.use_case.transform_file(
            Path::new("in.wav"),
            &dir.path().join("out.wav"),
            "polka",
            &mut NullPipelineLogger,
        );
        assert!(!outcome.success());
        assert!(matches!(outcome.error, Some(EngineError::UnknownGenre(ref g)) if g == "polka"));
        assert_eq!(fx.reads.load(Ordering::SeqCst), 0);
        assert!(fx.written.lock().unwrap().is_none());
    }

    #[test]
    fn test_empty_signal_rejected() {
        let fx = fixture(sine(0.5, 22050), None, false);
        let outcome = fx.use_case.transform(
            &AudioSignal::new(Vec::new(), 22050),
            "rock",
            &mut NullPipelineLogger,
        );
        assert!(matches!(outcome.error, Some(EngineError::EmptySignal)));
    }

    #[test]
    fn test_missing_classifier_does_not_block_transform() {
        let fx = fixture(sine(1.0, 22050), Some(unavailable_classifier()), false);
        let outcome = fx
            .use_case
            .transform(&sine(1.0, 22050), "rock", &mut NullPipelineLogger);
        assert!(outcome.success());
        assert!(outcome.predicted_genre().is_none());
        assert!(outcome.confidence().is_none());
        assert!(outcome.output.is_some());
    }

    #[test]
    fn test_missing_classifier_leaves_audio_unchanged() {
        let input = sine(1.0, 22050);
        let with = fixture(input.clone(), Some(unavailable_classifier()), false);
        let without = fixture(input.clone(), None, false);
        let a = with.use_case.transform(&input, "country", &mut NullPipelineLogger);
        let b = without.use_case.transform(&input, "country", &mut NullPipelineLogger);
        assert_eq!(a.output, b.output);
    }

    #[test]
    fn test_prediction_attached() {
        let fx = fixture(sine(1.0, 22050), Some(stub_classifier()), false);
        let outcome = fx
            .use_case
            .transform(&sine(1.0, 22050), "jazz", &mut NullPipelineLogger);
        assert!(outcome.success());
        assert_eq!(outcome.predicted_genre(), Some("classical"));
        assert!(outcome.confidence().unwrap() > 0.5);
    }

    #[test]
    fn test_classical_is_normalized_and_longer() {
        let input = sine(2.0, 22050);
        let fx = fixture(input.clone(), None, false);
        let outcome = fx
            .use_case
            .transform(&input, "classical", &mut NullPipelineLogger);
        let output = outcome.output.unwrap();
        assert_abs_diff_eq!(output.peak(), 1.0, epsilon = 1e-4);
        assert!(output.len() >= input.len());
        assert_eq!(output.sample_rate(), 22050);
    }

    #[rstest]
    #[case("rock")]
    #[case("electronic")]
    #[case("hiphop")]
    #[case("classical")]
    #[case("country")]
    #[case("jazz")]
    #[case("reggae")]
    fn test_every_genre_transforms(#[case] genre: &str) {
        let input = sine(1.0, 22050);
        let fx = fixture(input.clone(), None, false);
        let outcome = fx.use_case.transform(&input, genre, &mut NullPipelineLogger);
        assert!(outcome.success(), "{genre}: {:?}", outcome.error);
        let output = outcome.output.unwrap();
        assert!(output.samples().iter().all(|s| s.is_finite()));
        assert!(output.peak() <= 1.0 + 1e-5);
    }

    #[test]
    fn test_silent_input_degrades_gracefully() {
        let input = AudioSignal::new(vec![0.0; 22050], 22050);
        let fx = fixture(input.clone(), None, false);
        let outcome = fx.use_case.transform(&input, "jazz", &mut NullPipelineLogger);
        assert!(outcome.success(), "{:?}", outcome.error);
        assert!(outcome.output.unwrap().is_silent());
    }

    #[test]
    fn test_stage_timings_recorded() {
        let input = sine(1.0, 22050);
        let fx = fixture(input.clone(), None, false);
        let mut logger = StdoutPipelineLogger::new();
        fx.use_case.transform(&input, "reggae", &mut logger);
        for stage in ["filter_chain", "band_gain", "time_stretch", "compress", "normalize"] {
            assert!(logger.timings_for(stage).is_some(), "missing {stage}");
        }
    }

    #[test]
    fn test_non_finite_stage_output_names_stage() {
        let fx = fixture(sine(0.1, 8000), None, false);
        let stages = [StageOp::Gain(f32::MAX), StageOp::Gain(f32::MAX)];
        let err = fx
            .use_case
            .run_stages(
                &sine(0.1, 8000),
                &FilterChainSpec::default(),
                &stages,
                &mut NullPipelineLogger,
            )
            .unwrap_err();
        match err {
            EngineError::SignalProcessingFailure { stage, .. } => assert_eq!(stage, "gain"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_panicking_stage_is_reported() {
        let err = run_stage("explode", &mut NullPipelineLogger, || panic!("boom")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::SignalProcessingFailure { ref stage, ref reason }
                if stage == "explode" && reason == "boom"
        ));
    }

    #[test]
    fn test_transform_file_persists_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.wav");
        let fx = fixture(sine(1.0, 22050), None, false);
        let outcome = fx.use_case.transform_file(
            Path::new("in.wav"),
            &output,
            "reggae",
            &mut NullPipelineLogger,
        );
        assert!(outcome.success(), "{:?}", outcome.error);
        assert_eq!(outcome.output_path.as_deref(), Some(output.as_path()));
        assert!(output.exists());
        assert_eq!(fx.reads.load(Ordering::SeqCst), 1);
        assert!(fx.written.lock().unwrap().is_some());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_failure_reported_and_staging_removed() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.wav");
        let fx = fixture(sine(1.0, 22050), None, true);
        let outcome = fx.use_case.transform_file(
            Path::new("in.wav"),
            &output,
            "country",
            &mut NullPipelineLogger,
        );
        assert!(!outcome.success());
        assert_eq!(outcome.report().error.unwrap().kind, "AudioIo");
        assert!(outcome.output_path.is_none());
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_transform_file_with_wav_writer_leaves_single_file() {
        use crate::audio::infrastructure::wav_reader::WavAudioReader;
        use crate::audio::infrastructure::wav_writer::WavAudioWriter;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.wav");
        let use_case = TransformGenreUseCase::new(
            Box::new(StubAudioReader {
                signal: sine(1.0, 16000),
                reads: Arc::new(AtomicUsize::new(0)),
            }),
            Box::new(WavAudioWriter),
            None,
        );
        let outcome =
            use_case.transform_file(Path::new("in.wav"), &output, "reggae", &mut NullPipelineLogger);
        assert!(outcome.success(), "{:?}", outcome.error);

        let decoded = WavAudioReader.read_audio(&output).unwrap();
        assert_eq!(decoded.sample_rate(), 16000);
        assert_eq!(decoded.len(), outcome.output.unwrap().len());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
