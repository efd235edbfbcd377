//! File-drop implementation of the secondary channel.
//!
//! Used when no SFTP server is configured. Each file is written under a
//! temporary name and renamed into place, so a watcher never picks up half
//! a payload.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::secondary::SecondaryChannel;

/// Writes each payload as a file into a drop directory.
#[derive(Debug, Clone)]
pub struct FileDropChannel {
    dir: PathBuf,
}

impl FileDropChannel {
    /// Create the channel, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The drop directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, data: &str, file_name: &str) -> io::Result<PathBuf> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid drop file name '{}'", file_name),
            ));
        }

        let target = self.dir.join(file_name);
        let staging = self.dir.join(format!(".{}.partial", file_name));
        fs::write(&staging, data.as_bytes())?;
        fs::rename(&staging, &target)?;
        Ok(target)
    }
}

impl SecondaryChannel for FileDropChannel {
    fn transfer_data(&self, data: &str, file_name: &str) -> bool {
        match self.write(data, file_name) {
            Ok(path) => {
                tracing::info!(path = %path.display(), bytes = data.len(), "Payload dropped on secondary channel");
                true
            }
            Err(e) => {
                tracing::error!(dir = %self.dir.display(), file = %file_name, error = %e, "Secondary channel write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let channel = FileDropChannel::new(dir.path().join("outbox")).unwrap();

        assert!(channel.transfer_data(r#"{"nodeid":"n1"}"#, "n1-2024-01-02_03-04-05.json"));

        let written = fs::read_to_string(channel.dir().join("n1-2024-01-02_03-04-05.json")).unwrap();
        assert_eq!(written, r#"{"nodeid":"n1"}"#);
        let leftovers: Vec<_> = fs::read_dir(channel.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let channel = FileDropChannel::new(dir.path()).unwrap();
        assert!(!channel.transfer_data("x", "../escape.json"));
        assert!(!channel.transfer_data("x", ""));
    }

    #[test]
    fn test_unwritable_dir_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let channel = FileDropChannel::new(dir.path().join("gone")).unwrap();
        fs::remove_dir(channel.dir()).unwrap();
        assert!(!channel.transfer_data("x", "n1.json"));
    }
}
