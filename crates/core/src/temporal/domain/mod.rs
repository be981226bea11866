pub mod beat_track;
