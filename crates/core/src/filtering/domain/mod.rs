pub mod filter_spec;
