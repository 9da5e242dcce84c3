//! Host process interfaces for romkeep
//!
//! This crate defines the thin OS-process abstraction the session manager
//! and the playtime accountant run against. It contains no platform code
//! itself; `romkeep-host-linux` implements it with real process groups and
//! [`MockHost`] simulates process states for tests.

mod handle;
mod mock;
mod traits;

pub use handle::*;
pub use mock::*;
pub use traits::*;
