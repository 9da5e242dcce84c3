//! Linux host for romkeep
//!
//! Provides:
//! - Launcher spawning as a new session and process group leader
//! - STOP/CONT/TERM delivery to whole process groups
//! - Exit observation for launched groups
//! - Scheduler state polling of arbitrary pids
//! - Switch-combo detection from connected gamepads

mod adapter;
mod input;
mod process;
mod procstat;

pub use adapter::*;
pub use input::*;
pub use process::*;
pub use procstat::*;
