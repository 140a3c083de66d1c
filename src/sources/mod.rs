//! Bundled frame sources and encoders

pub mod test_pattern;

pub use test_pattern::{PassthroughEncoder, TestPatternSource};
