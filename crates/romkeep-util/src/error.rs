//! Error types for romkeep

use thiserror::Error;

use crate::RomFile;

/// Core error type for romkeep operations
#[derive(Debug, Error)]
pub enum RomkeepError {
    #[error("File missing: {0}")]
    FileMissing(RomFile),

    #[error("No launcher configured for system '{system}'")]
    NoLauncher { system: String },

    #[error("No session for {0}")]
    NoSession(RomFile),

    #[error("Host error: {0}")]
    HostError(String),
}

impl RomkeepError {
    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RomkeepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_cause() {
        let err = RomkeepError::FileMissing(RomFile::new("/roms/GBA/a.gba"));
        assert_eq!(err.to_string(), "File missing: /roms/GBA/a.gba");
        let err = RomkeepError::NoLauncher {
            system: "GBA".into(),
        };
        assert_eq!(err.to_string(), "No launcher configured for system 'GBA'");
        assert_eq!(RomkeepError::host("boom").to_string(), "Host error: boom");
    }
}
