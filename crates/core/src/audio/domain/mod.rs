pub mod audio_reader;
pub mod audio_signal;
pub mod audio_writer;
pub mod genre;
