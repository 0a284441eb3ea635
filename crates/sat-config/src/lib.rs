//! Terminal configuration management
//!
//! This crate provides configuration loading and parsing for the satellite
//! return-link terminal:
//! - TOML configuration file parsing
//! - Terminal configuration structures
//! - Random-access allocation channel configuration

pub mod alloc_channel;
pub mod terminal_config;
pub mod toml_config;

pub use alloc_channel::*;
pub use terminal_config::*;
pub use toml_config::*;
