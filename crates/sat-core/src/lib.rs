//! Core utilities for the satellite return-link terminal stack
//!
//! This crate provides fundamental types and utilities used across the stack:
//! - SimTime for simulated-clock arithmetic
//! - Superframe/frame/slot timing model and sequence lookup
//! - Entity and SAP identifiers used for message routing
//! - Common macros and debug utilities

pub mod debug;
pub mod sat_common;
pub mod sat_entities;
pub mod sim_time;
pub mod superframe;

// Re-export commonly used items
pub use sat_common::*;
pub use sim_time::SimTime;
pub use superframe::{FrameConf, SuperframeConf, SuperframeConfErr, SuperframeSeq};
