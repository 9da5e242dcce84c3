//! Shared utilities for romkeep
//!
//! This crate provides:
//! - ID types (RomFile, SessionId)
//! - Time utilities (play timestamps, duration formatting)
//! - Error types
//! - Default paths for config, data and recovery files

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
