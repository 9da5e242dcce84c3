//! Persistence layer for romkeep
//!
//! Provides:
//! - Per-game statistics keyed by ROM path
//! - Merge-on-write so playtime and metadata writers never clobber each other
//! - A change counter for noticing writes made by other processes
//! - A repository wrapper that degrades to "no data" when storage fails

mod merge;
mod repository;
mod sqlite;
mod traits;

pub use merge::*;
pub use repository::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
