use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use genreshift_core::audio::domain::genre::Genre;
use genreshift_core::audio::infrastructure::wav_reader::WavAudioReader;
use genreshift_core::audio::infrastructure::wav_writer::WavAudioWriter;
use genreshift_core::classification::infrastructure::classifier_model::ClassifierModel;
use genreshift_core::pipeline::classify_audio_use_case::ClassifyAudioUseCase;
use genreshift_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use genreshift_core::pipeline::transform_genre_use_case::TransformGenreUseCase;
use genreshift_core::shared::config::EngineConfig;
use genreshift_core::shared::constants::AUDIO_EXTENSIONS;
use genreshift_core::spectral::infrastructure::stft::Stft;

/// Genre transformation and classification for audio recordings.
#[derive(Parser)]
#[command(name = "genreshift", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-render a WAV file in the style of a target genre.
    Transform {
        /// Input WAV file.
        input: PathBuf,

        /// Output WAV file (16-bit mono PCM at the input rate).
        output: PathBuf,

        /// Target genre (see `genreshift genres`).
        #[arg(long)]
        genre: String,

        #[command(flatten)]
        engine: EngineArgs,

        /// Skip genre prediction of the input.
        #[arg(long)]
        no_classify: bool,
    },

    /// Predict the genre of a WAV file.
    Classify {
        /// Input WAV file.
        input: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,

        /// Also write the spectrogram image the classifier sees.
        #[arg(long)]
        spectrogram_out: Option<PathBuf>,
    },

    /// List the supported target genres.
    Genres,
}

#[derive(Args)]
struct EngineArgs {
    /// Classifier model file (ONNX). Overrides the config file.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Engine config (JSON).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Transform {
            input,
            output,
            genre,
            engine,
            no_classify,
        } => run_transform(&input, &output, &genre, &engine, no_classify),
        Command::Classify {
            input,
            engine,
            spectrogram_out,
        } => run_classify(&input, &engine, spectrogram_out.as_deref()),
        Command::Genres => {
            for genre in Genre::ALL {
                println!("{genre}");
            }
            Ok(())
        }
    }
}

fn run_transform(
    input: &Path,
    output: &Path,
    genre: &str,
    engine: &EngineArgs,
    no_classify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    validate_input(input)?;
    let config = load_config(engine)?;

    let classifier = if config.classify && !no_classify {
        Some(build_classifier(&config)?)
    } else {
        None
    };

    let use_case = TransformGenreUseCase::new(
        Box::new(WavAudioReader),
        Box::new(WavAudioWriter),
        classifier,
    )
    .with_analysis(config.frame_length, config.hop_length);

    let mut logger = StdoutPipelineLogger::new();
    let outcome = use_case.transform_file(input, output, genre, &mut logger);
    let report = outcome.report();
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.success {
        process::exit(2);
    }
    Ok(())
}

fn run_classify(
    input: &Path,
    engine: &EngineArgs,
    spectrogram_out: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    validate_input(input)?;
    let config = load_config(engine)?;
    let use_case = ClassifyAudioUseCase::new(Box::new(WavAudioReader), build_classifier(&config)?);

    if let Some(path) = spectrogram_out {
        use_case.save_spectrogram(
            input,
            path,
            Stft::new(config.frame_length, config.hop_length),
            config.image_size,
        )?;
        log::info!("Spectrogram written to {}", path.display());
    }

    let result = use_case.classify_file(input)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn load_config(engine: &EngineArgs) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = match &engine.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(model) = &engine.model {
        config.model_path = Some(model.clone());
    }
    Ok(config)
}

fn build_classifier(config: &EngineConfig) -> Result<Arc<ClassifierModel>, Box<dyn std::error::Error>> {
    let bundled = bundled_model_dir();
    let classifier = ClassifierModel::from_config(config, bundled.as_deref())?;
    if config.eager_model_load {
        if let Err(e) = classifier.load() {
            log::warn!("{e}");
        }
    }
    Ok(Arc::new(classifier))
}

/// `models/` next to the executable, for pre-packaged installs.
fn bundled_model_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}

fn validate_input(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }
    if !is_audio(input) {
        return Err(format!(
            "Unsupported input {}: expected one of {}",
            input.display(),
            AUDIO_EXTENSIONS.join(", ")
        )
        .into());
    }
    Ok(())
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
