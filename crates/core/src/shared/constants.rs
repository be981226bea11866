pub const CLASSIFIER_MODEL_NAME: &str = "genre_cnn.onnx";
pub const CLASSIFIER_LABELS_NAME: &str = "genre_labels.json";

/// Directory name under the platform cache dir where models are looked up.
pub const APP_DIR_NAME: &str = "genreshift";

/// STFT frame length shared by every spectral stage.
pub const FRAME_LENGTH: usize = 2048;

/// Hop between successive STFT frames.
pub const HOP_LENGTH: usize = 512;

/// Side length of the square spectrogram image fed to the classifier.
pub const CLASSIFIER_IMAGE_SIZE: u32 = 128;

/// Label order the default classifier was trained with.
pub const DEFAULT_CLASSIFIER_LABELS: &[&str] = &[
    "blues",
    "classical",
    "country",
    "disco",
    "hiphop",
    "jazz",
    "metal",
    "pop",
    "reggae",
    "rock",
];

pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "wave"];

/// Bit depth of persisted output audio.
pub const OUTPUT_BITS_PER_SAMPLE: u16 = 16;
