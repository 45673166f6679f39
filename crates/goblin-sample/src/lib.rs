//! # Goblin Sample Library
//!
//! This library exposes the orchestration layer of the sample for integration testing.

pub mod lifecycle;
