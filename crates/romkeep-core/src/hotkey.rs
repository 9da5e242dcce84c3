//! Marker file that disables the system hotkey daemon while a game runs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct HotkeyMarker {
    path: PathBuf,
}

impl HotkeyMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_present(&self) -> bool {
        self.path.exists()
    }

    pub fn create(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, b"")
    }

    pub fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_and_remove() {
        let dir = TempDir::new().unwrap();
        let marker = HotkeyMarker::new(dir.path().join("run/hotkeys.disabled"));
        assert!(!marker.is_present());

        marker.create().unwrap();
        assert!(marker.is_present());
        marker.create().unwrap();

        marker.remove().unwrap();
        assert!(!marker.is_present());
        marker.remove().unwrap();
    }
}
