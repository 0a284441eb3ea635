pub mod component_test;
pub mod sink;

pub use component_test::{default_test_config, ComponentTest};
