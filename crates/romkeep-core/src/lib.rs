//! Core session coordination for romkeep
//!
//! This crate is the heart of romkeep, containing:
//! - The runtime game entity and its derived display fields
//! - The session manager (NotRunning -> Running <-> Suspended -> Terminated)
//! - The recovery file of sessions to resume after a restart
//! - The playtime accountant run by the per-session accounting process
//! - The activity list engine (filter, sort, selection clamping)
//! - The [`Library`] facade the presentation layer drives

mod accounting;
mod activity;
mod entity;
mod hotkey;
mod library;
mod recovery;
mod session;

pub use accounting::*;
pub use activity::*;
pub use entity::*;
pub use hotkey::*;
pub use library::*;
pub use recovery::*;
pub use session::*;
