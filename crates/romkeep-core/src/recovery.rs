//! Recovery file: the sessions to resume after a restart

use romkeep_util::RomFile;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Newline-separated list of ROM files with live sessions.
///
/// Rewritten in full on every change; removed once the list is empty.
#[derive(Debug, Clone)]
pub struct RecoveryFile {
    path: PathBuf,
}

impl RecoveryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries in file order; a missing file reads as empty
    pub fn read(&self) -> io::Result<Vec<RomFile>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut files: Vec<RomFile> = Vec::new();
        for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let file = RomFile::new(line);
            if !files.contains(&file) {
                files.push(file);
            }
        }
        Ok(files)
    }

    pub fn write(&self, files: &[RomFile]) -> io::Result<()> {
        if files.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            };
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut contents = String::new();
        for file in files {
            contents.push_str(file.as_str());
            contents.push('\n');
        }
        fs::write(&self.path, contents)?;
        debug!(path = %self.path.display(), entries = files.len(), "Recovery file written");
        Ok(())
    }
}
