pub mod classify_audio_use_case;
pub mod genre_profile;
pub mod pipeline_logger;
pub mod stage_op;
pub mod transform_genre_use_case;
pub mod transformation_outcome;
