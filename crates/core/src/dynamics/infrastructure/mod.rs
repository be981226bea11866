pub mod expansion;
pub mod normalize;
pub mod reverb;
pub mod shaping;
