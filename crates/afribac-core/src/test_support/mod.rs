//! Test helpers shared with downstream crates (`test-utils` feature)

pub mod mocks;

pub use mocks::{MockCall, MockLanguageModel, MockModelFactory};
