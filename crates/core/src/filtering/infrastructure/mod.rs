pub mod biquad;
pub mod compander;
pub mod filter_chain;
pub mod tap_delay;
