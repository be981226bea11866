pub mod beat_tracker;
pub mod onset;
pub mod pitch_shift;
pub mod swing;
pub mod time_stretch;
