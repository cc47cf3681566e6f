//! Aide Control library - HTTP client and command helpers for aidectl.

pub mod client;
pub mod commands;
pub mod params;
