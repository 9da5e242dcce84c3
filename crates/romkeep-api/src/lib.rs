//! Shared data types for romkeep
//!
//! This crate defines the types every romkeep process agrees on:
//! - Library records as persisted in the store
//! - Session states and wait outcomes
//! - Filter and sort settings for the activity list

mod query;
mod types;

pub use query::*;
pub use types::*;
